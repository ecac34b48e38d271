use crate::r#type::IndexableNum;

/// An axis-aligned hyper-rectangle with inclusive bounds, used by region queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region<N: IndexableNum, const K: usize> {
    /// Lower bound along each axis.
    pub min: [N; K],
    /// Upper bound along each axis.
    pub max: [N; K],
}

impl<N: IndexableNum, const K: usize> Region<N, K> {
    /// Create a region from its lower and upper corners.
    pub fn new(min: [N; K], max: [N; K]) -> Self {
        Self { min, max }
    }

    /// The cube of half-width `range` centred on `center`.
    ///
    /// A negative `range` is treated as zero. Bounds saturate at the limits of `N`, so this
    /// never overflows for integer scalars.
    pub fn around(center: [N; K], range: N) -> Self {
        let range = if range < N::zero() { N::zero() } else { range };
        let min = std::array::from_fn(|i| {
            let c = center[i];
            if c < N::min_value() + range {
                N::min_value()
            } else {
                c - range
            }
        });
        let max = std::array::from_fn(|i| {
            let c = center[i];
            if c > N::max_value() - range {
                N::max_value()
            } else {
                c + range
            }
        });
        Self { min, max }
    }

    /// Whether `coords` lie inside this region, bounds included.
    #[inline]
    pub fn contains(&self, coords: &[N; K]) -> bool {
        (0..K).all(|i| coords[i] >= self.min[i] && coords[i] <= self.max[i])
    }
}

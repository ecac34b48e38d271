//! Distance metrics for nearest-neighbor and radius queries.
//!
//! Coordinates are widened to `f64` before any distance is computed, so integer trees never
//! overflow or underflow while subtracting.

/// A metric over K-dimensional points.
///
/// Pruning relies on [`axis_distance`][DistanceMetric::axis_distance] being a lower bound of
/// [`distance`][DistanceMetric::distance]: for any two points, the axis distance along any single
/// dimension must not exceed the full distance. All metrics in this module satisfy that.
pub trait DistanceMetric {
    /// The distance between two points given as equally long coordinate slices.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// The distance between a coordinate and a splitting hyperplane along one axis.
    #[inline]
    fn axis_distance(&self, a: f64, b: f64) -> f64 {
        (a - b).abs()
    }
}

/// Euclidean (L2) distance. This is the default metric of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EuclideanDistance;

impl DistanceMetric for EuclideanDistance {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(ai, bi)| (ai - bi) * (ai - bi))
            .sum::<f64>()
            .sqrt()
    }
}

/// Manhattan (L1) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManhattanDistance;

impl DistanceMetric for ManhattanDistance {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(ai, bi)| (ai - bi).abs()).sum()
    }
}

/// Chebyshev (L∞) distance: the largest per-axis offset.
///
/// A radius query under this metric selects the axis-aligned cube of half-width `radius`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChebyshevDistance;

impl DistanceMetric for ChebyshevDistance {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(ai, bi)| (ai - bi).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn metrics_agree_on_a_single_axis() {
        let a = [1.0, 5.0, -2.0];
        let b = [4.0, 5.0, -2.0];
        assert_eq!(EuclideanDistance.distance(&a, &b), 3.0);
        assert_eq!(ManhattanDistance.distance(&a, &b), 3.0);
        assert_eq!(ChebyshevDistance.distance(&a, &b), 3.0);
    }

    #[test]
    fn metrics_differ_off_axis() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_eq!(EuclideanDistance.distance(&a, &b), 5.0);
        assert_eq!(ManhattanDistance.distance(&a, &b), 7.0);
        assert_eq!(ChebyshevDistance.distance(&a, &b), 4.0);
    }

    #[test]
    fn axis_distance_bounds_full_distance() {
        let a = [1.5, -3.0, 8.0];
        let b = [-2.0, 4.0, 7.5];
        for axis in 0..3 {
            let axis_dist = EuclideanDistance.axis_distance(a[axis], b[axis]);
            assert!(axis_dist <= EuclideanDistance.distance(&a, &b));
            assert!(axis_dist <= ManhattanDistance.distance(&a, &b));
            assert!(axis_dist <= ChebyshevDistance.distance(&a, &b));
        }
    }
}

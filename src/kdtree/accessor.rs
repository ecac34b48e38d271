//! Coordinate accessors: how the tree reads dimension `i` out of a stored point.

use geo_traits::CoordTrait;

use crate::r#type::IndexableNum;

/// Extracts a single coordinate from a point.
///
/// The tree only ever requests dimensions in `0..K`. An accessor must be consistent: the same
/// point and dimension must always yield the same value, otherwise the partition invariant of
/// the tree silently breaks.
///
/// Any closure `Fn(&P, usize) -> N` is an accessor. Annotate the point parameter's type
/// (`|p: &MyPoint, dim| ...`) so the closure is general over the borrow's lifetime.
pub trait Accessor<P: ?Sized> {
    /// The scalar type of a single coordinate.
    type Scalar: IndexableNum;

    /// The value of `point` along dimension `dim`.
    fn coordinate(&self, point: &P, dim: usize) -> Self::Scalar;
}

impl<P, N, F> Accessor<P> for F
where
    F: Fn(&P, usize) -> N,
    N: IndexableNum,
{
    type Scalar = N;

    #[inline]
    fn coordinate(&self, point: &P, dim: usize) -> N {
        self(point, dim)
    }
}

/// Accessor for points stored as fixed-size arrays, e.g. `[f64; 3]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayAccessor;

impl<N: IndexableNum, const D: usize> Accessor<[N; D]> for ArrayAccessor {
    type Scalar = N;

    #[inline]
    fn coordinate(&self, point: &[N; D], dim: usize) -> N {
        point[dim]
    }
}

/// Accessor for any [`CoordTrait`] implementation, reading dimension `i` with
/// [`CoordTrait::nth_or_panic`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordAccessor;

impl<C> Accessor<C> for CoordAccessor
where
    C: CoordTrait,
    C::T: IndexableNum,
{
    type Scalar = C::T;

    #[inline]
    fn coordinate(&self, point: &C, dim: usize) -> C::T {
        point.nth_or_panic(dim)
    }
}

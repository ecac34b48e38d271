use std::cmp;

use crate::error::{KdTreeError, Result};
use crate::kdtree::accessor::Accessor;
use crate::kdtree::distance::EuclideanDistance;
use crate::kdtree::KdTree;
use crate::r#type::IndexableNum;

/// Ranges longer than this sort their halves on the rayon thread pool.
#[cfg(feature = "rayon")]
const PARALLEL_SORT_THRESHOLD: usize = 4096;

/// A builder to bulk load a balanced [`KdTree`].
///
/// Collecting values first and linking them once is faster than repeated
/// [`insert`][KdTree::insert] calls and always yields a tree of minimal height.
///
/// ```
/// use kdtree_index::kdtree::{ArrayAccessor, KdTreeBuilder};
///
/// let mut builder = KdTreeBuilder::<[i32; 2], _, 2>::new(ArrayAccessor).with_capacity(4);
/// builder.add([1, 1]);
/// builder.add([4, 2]);
/// builder.add([3, 8]);
/// builder.add([7, 5]);
/// let tree = builder.finish();
///
/// assert_eq!(tree.len(), 4);
/// assert_eq!(tree.height(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct KdTreeBuilder<P, A, const K: usize, M = EuclideanDistance> {
    values: Vec<P>,
    accessor: A,
    metric: M,
}

impl<P, A: Accessor<P>, const K: usize> KdTreeBuilder<P, A, K> {
    /// Create a new builder for a tree using Euclidean distance.
    ///
    /// Panics if `K` is zero.
    pub fn new(accessor: A) -> Self {
        Self::with_metric(accessor, EuclideanDistance)
    }

    /// Create a new builder for a tree using Euclidean distance, failing if `K` is zero.
    pub fn try_new(accessor: A) -> Result<Self> {
        if K == 0 {
            return Err(KdTreeError::ZeroDimensions);
        }
        Ok(Self::with_metric(accessor, EuclideanDistance))
    }
}

impl<P, A: Accessor<P>, const K: usize, M> KdTreeBuilder<P, A, K, M> {
    /// Create a new builder for a tree using the given distance metric.
    ///
    /// Panics if `K` is zero.
    pub fn with_metric(accessor: A, metric: M) -> Self {
        assert!(K > 0, "A KD-tree needs at least one dimension");
        Self {
            values: Vec::new(),
            accessor,
            metric,
        }
    }

    /// Reserve room for `capacity` more values.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.values.reserve(capacity);
        self
    }

    /// Add a value to the index. Returns the insertion position of the value.
    pub fn add(&mut self, value: P) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    /// The number of values added so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no value was added yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume this builder, performing the k-d sort and generating a balanced tree.
    #[tracing::instrument(level = "debug", skip_all, fields(len = self.values.len()))]
    pub fn finish(self) -> KdTree<P, A, K, M> {
        let mut tree = KdTree::empty(self.accessor, self.metric);
        tree.rebuild(self.values);
        tracing::debug!(height = tree.height(), "built tree");
        tree
    }
}

impl<P, A: Accessor<P>, const K: usize, M> Extend<P> for KdTreeBuilder<P, A, K, M> {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

impl<P, A: Accessor<P>, const K: usize, M> KdTree<P, A, K, M> {
    /// Rebuild the tree into a balanced shape.
    ///
    /// Every value is taken out and relinked so that each subtree root is the median of its
    /// subtree along the subtree's split axis. The height afterwards is `floor(log2(n)) + 1`.
    /// All handles become stale; the number of values is unchanged.
    #[tracing::instrument(level = "debug", skip_all, fields(len = self.len()))]
    pub fn optimise(&mut self) {
        let values = self.take_values();
        self.rebuild(values);
        tracing::debug!(height = self.height(), "rebuilt balanced tree");
    }

    /// Discard the current contents and bulk load `values` into a balanced tree.
    #[tracing::instrument(level = "debug", skip_all, fields(len = self.len()))]
    pub fn replace_and_optimise<I: IntoIterator<Item = P>>(&mut self, values: I) {
        self.take_values();
        self.rebuild(values.into_iter().collect());
        tracing::debug!(len = self.len(), height = self.height(), "replaced contents");
    }

    /// Link `values` into this (empty) tree in kd-sorted order.
    pub(crate) fn rebuild(&mut self, values: Vec<P>) {
        debug_assert!(self.is_empty());
        let mut coords: Vec<A::Scalar> = Vec::with_capacity(values.len() * K);
        for value in &values {
            for axis in 0..K {
                coords.push(self.coordinate(value, axis));
            }
        }
        let mut ids: Vec<usize> = (0..values.len()).collect();

        // kd-sort ids and coords so that the median of every range is its subtree root
        sort::<A::Scalar, K>(&mut ids, &mut coords, 0);

        let mut values: Vec<Option<P>> = values.into_iter().map(Some).collect();
        self.root = self.link_sorted(&mut values, &ids, None);
    }

    fn link_sorted(
        &mut self,
        values: &mut [Option<P>],
        ids: &[usize],
        parent: Option<usize>,
    ) -> Option<usize> {
        if ids.is_empty() {
            return None;
        }
        let m = ids.len() >> 1;
        let value = values[ids[m]].take().expect("each value is linked once");
        let idx = self.alloc(value, parent);
        let left = self.link_sorted(values, &ids[..m], Some(idx));
        let right = self.link_sorted(values, &ids[m + 1..], Some(idx));
        let node = self.node_mut(idx);
        node.left = left;
        node.right = right;
        Some(idx)
    }
}

/// Recursively kd-sort `ids` and their interleaved `coords` (K per id), splitting each range at
/// its middle index on the axis `depth % K`.
fn sort<N: IndexableNum, const K: usize>(ids: &mut [usize], coords: &mut [N], depth: usize) {
    let len = ids.len();
    if len <= 1 {
        return;
    }

    // middle index
    let m = len >> 1;

    // sort ids and coords around the middle index so that the halves lie either side of it on
    // the current axis
    select::<N, K>(ids, coords, m, 0, len - 1, depth % K);

    let (left_ids, rest_ids) = ids.split_at_mut(m);
    let (left_coords, rest_coords) = coords.split_at_mut(m * K);
    sort_halves::<N, K>(
        (left_ids, left_coords),
        (&mut rest_ids[1..], &mut rest_coords[K..]),
        depth + 1,
    );
}

#[cfg(feature = "rayon")]
fn sort_halves<N: IndexableNum, const K: usize>(
    left: (&mut [usize], &mut [N]),
    right: (&mut [usize], &mut [N]),
    depth: usize,
) {
    if left.0.len() + right.0.len() > PARALLEL_SORT_THRESHOLD {
        rayon::join(
            || sort::<N, K>(left.0, left.1, depth),
            || sort::<N, K>(right.0, right.1, depth),
        );
    } else {
        sort::<N, K>(left.0, left.1, depth);
        sort::<N, K>(right.0, right.1, depth);
    }
}

#[cfg(not(feature = "rayon"))]
fn sort_halves<N: IndexableNum, const K: usize>(
    left: (&mut [usize], &mut [N]),
    right: (&mut [usize], &mut [N]),
    depth: usize,
) {
    sort::<N, K>(left.0, left.1, depth);
    sort::<N, K>(right.0, right.1, depth);
}

/// Custom Floyd-Rivest selection algorithm: sort ids and coords so that [left..k-1] items are
/// not greater than the k-th item on `axis`, and [k+1..right] items are not smaller.
#[inline]
fn select<N: IndexableNum, const K: usize>(
    ids: &mut [usize],
    coords: &mut [N],
    k: usize,
    mut left: usize,
    mut right: usize,
    axis: usize,
) {
    while right > left {
        if right - left > 600 {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = f64::ln(n);
            let s = 0.5 * f64::exp((2.0 * z) / 3.0);
            let sd = 0.5
                * f64::sqrt((z * s * (n - s)) / n)
                * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
            let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
            let new_right = cmp::min(
                right,
                f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
            );
            select::<N, K>(ids, coords, k, new_left, new_right, axis);
        }

        let t = coords[K * k + axis];
        let mut i = left;
        let mut j = right;

        swap_item::<N, K>(ids, coords, left, k);
        if coords[K * right + axis] > t {
            swap_item::<N, K>(ids, coords, left, right);
        }

        while i < j {
            swap_item::<N, K>(ids, coords, i, j);
            i += 1;
            j -= 1;
            while coords[K * i + axis] < t {
                i += 1;
            }
            while coords[K * j + axis] > t {
                j -= 1;
            }
        }

        if coords[K * left + axis] == t {
            swap_item::<N, K>(ids, coords, left, j);
        } else {
            j += 1;
            swap_item::<N, K>(ids, coords, j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            // k >= 1 for every range of two or more items, so j >= 1 here
            right = j - 1;
        }
    }
}

#[inline]
fn swap_item<N: IndexableNum, const K: usize>(
    ids: &mut [usize],
    coords: &mut [N],
    i: usize,
    j: usize,
) {
    ids.swap(i, j);
    for axis in 0..K {
        coords.swap(K * i + axis, K * j + axis);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn check_partition<const K: usize>(ids: &[usize], coords: &[i32], depth: usize) {
        if ids.len() <= 1 {
            return;
        }
        let m = ids.len() >> 1;
        let axis = depth % K;
        let split = coords[K * m + axis];
        for i in 0..m {
            assert!(coords[K * i + axis] <= split, "left half on axis {axis}");
        }
        for i in m + 1..ids.len() {
            assert!(coords[K * i + axis] >= split, "right half on axis {axis}");
        }
        check_partition::<K>(&ids[..m], &coords[..m * K], depth + 1);
        check_partition::<K>(&ids[m + 1..], &coords[(m + 1) * K..], depth + 1);
    }

    #[test]
    fn sort_partitions_every_range() {
        // deterministic scramble with plenty of repeated coordinates
        let n = 1500;
        let mut coords: Vec<i32> = (0..n * 3).map(|i| ((i * 7919) % 97) as i32).collect();
        let original = coords.clone();
        let mut ids: Vec<usize> = (0..n).collect();

        sort::<i32, 3>(&mut ids, &mut coords, 0);

        check_partition::<3>(&ids, &coords, 0);
        for (pos, id) in ids.iter().enumerate() {
            assert_eq!(
                &coords[pos * 3..pos * 3 + 3],
                &original[id * 3..id * 3 + 3],
                "coords travel with their ids"
            );
        }
    }

    #[test]
    fn select_places_the_kth_smallest() {
        let mut coords = vec![9, 1, 8, 2, 7, 3, 6, 4, 5, 0];
        let mut ids: Vec<usize> = (0..coords.len()).collect();
        select::<i32, 1>(&mut ids, &mut coords, 4, 0, 9, 0);
        assert_eq!(coords[4], 4);
        assert!(coords[..4].iter().all(|&c| c <= 4));
        assert!(coords[5..].iter().all(|&c| c >= 4));
    }
}

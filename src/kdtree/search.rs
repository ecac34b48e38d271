//! Nearest-neighbor, radius and region queries.
//!
//! All searches are depth-first over an explicit stack, visiting the side of each split that
//! contains the target first and pruning the far side with the distance to the splitting
//! hyperplane.

use tinyvec::TinyVec;

use crate::kdtree::accessor::Accessor;
use crate::kdtree::distance::DistanceMetric;
use crate::kdtree::node::NodeId;
use crate::kdtree::region::Region;
use crate::kdtree::KdTree;
use crate::r#type::widen;

impl<P, A: Accessor<P>, const K: usize, M: DistanceMetric> KdTree<P, A, K, M> {
    /// The value nearest to `target` and its distance, considering only values within
    /// `max_distance` (inclusive). Pass `f64::INFINITY` for an unbounded search.
    ///
    /// Returns `None` if the tree is empty or nothing lies within `max_distance`. When several
    /// values are equally near, which one is returned depends on the shape of the tree.
    pub fn find_nearest(&self, target: &P, max_distance: f64) -> Option<(&P, f64)> {
        self.nearest_slot(target, max_distance, |_| true)
            .map(|(idx, distance)| (&self.node(idx).value, distance))
    }

    /// Like [`find_nearest`][KdTree::find_nearest], returning a handle instead of the value.
    pub fn find_nearest_id(&self, target: &P, max_distance: f64) -> Option<(NodeId, f64)> {
        self.nearest_slot(target, max_distance, |_| true)
            .map(|(idx, distance)| (self.id_of(idx), distance))
    }

    /// The nearest value to `target` among the values accepted by `predicate`.
    pub fn find_nearest_if<F: FnMut(&P) -> bool>(
        &self,
        target: &P,
        max_distance: f64,
        predicate: F,
    ) -> Option<(&P, f64)> {
        self.nearest_slot(target, max_distance, predicate)
            .map(|(idx, distance)| (&self.node(idx).value, distance))
    }

    fn nearest_slot<F: FnMut(&P) -> bool>(
        &self,
        target: &P,
        max_distance: f64,
        mut predicate: F,
    ) -> Option<(usize, f64)> {
        let root = self.root?;
        let target_coords = self.coords(target);
        let target_point = self.widened(target);

        let mut best: Option<(usize, f64)> = None;

        // (slot, depth, distance from the target to the region of this subtree along the
        // parent's split axis)
        let mut stack: TinyVec<[(usize, usize, f64); 32]> = TinyVec::new();
        stack.push((root, 0, 0.0));

        while let Some((idx, depth, bound)) = stack.pop() {
            match best {
                Some((_, best_distance)) if bound >= best_distance => continue,
                None if bound > max_distance || max_distance.is_nan() => continue,
                _ => {}
            }

            let node = self.node(idx);
            if predicate(&node.value) {
                let distance = self
                    .metric
                    .distance(&target_point, &self.widened(&node.value));
                let improves = match best {
                    Some((_, best_distance)) => distance < best_distance,
                    None => distance <= max_distance,
                };
                if improves {
                    best = Some((idx, distance));
                }
            }

            let axis = depth % K;
            let split = self.coordinate(&node.value, axis);
            let (near, far) = if target_coords[axis] < split {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };

            // Note: the far side is pushed first so that the near side is searched first
            if let Some(far) = far {
                let plane = self
                    .metric
                    .axis_distance(widen(target_coords[axis]), widen(split));
                stack.push((far, depth + 1, plane));
            }
            if let Some(near) = near {
                stack.push((near, depth + 1, 0.0));
            }
        }

        best
    }

    /// Call `visit` with every value whose distance to `target` is at most `radius`, in
    /// depth-first, near-side-first order.
    pub fn visit_within_range<'a, F: FnMut(&'a P)>(
        &'a self,
        target: &P,
        radius: f64,
        mut visit: F,
    ) {
        let Some(root) = self.root else {
            return;
        };
        let target_coords = self.coords(target);
        let target_point = self.widened(target);

        let mut stack: TinyVec<[(usize, usize); 32]> = TinyVec::new();
        stack.push((root, 0));

        while let Some((idx, depth)) = stack.pop() {
            let node = self.node(idx);
            if self
                .metric
                .distance(&target_point, &self.widened(&node.value))
                <= radius
            {
                visit(&node.value);
            }

            let axis = depth % K;
            let split = self.coordinate(&node.value, axis);
            let (near, far) = if target_coords[axis] < split {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };

            if let Some(far) = far {
                let plane = self
                    .metric
                    .axis_distance(widen(target_coords[axis]), widen(split));
                if plane <= radius {
                    stack.push((far, depth + 1));
                }
            }
            if let Some(near) = near {
                stack.push((near, depth + 1));
            }
        }
    }

    /// The number of values whose distance to `target` is at most `radius`.
    pub fn count_within_range(&self, target: &P, radius: f64) -> usize {
        let mut count = 0;
        self.visit_within_range(target, radius, |_| count += 1);
        count
    }

    /// Append every value whose distance to `target` is at most `radius` to `sink`.
    ///
    /// Values arrive in visitation order, not sorted by distance.
    ///
    /// ```
    /// use kdtree_index::kdtree::{ArrayAccessor, KdTree};
    ///
    /// let mut tree = KdTree::<[i32; 2], _, 2>::new(ArrayAccessor);
    /// tree.extend([[0, 0], [1, 1], [5, 5]]);
    ///
    /// let mut found: Vec<[i32; 2]> = vec![];
    /// tree.find_within_range(&[0, 0], 2., &mut found);
    /// found.sort();
    /// assert_eq!(found, vec![[0, 0], [1, 1]]);
    /// ```
    pub fn find_within_range<'a, E: Extend<&'a P>>(
        &'a self,
        target: &P,
        radius: f64,
        sink: &mut E,
    ) {
        self.visit_within_range(target, radius, |value| sink.extend(std::iter::once(value)));
    }

    /// Every value whose distance to `target` is at most `radius`.
    pub fn within_range(&self, target: &P, radius: f64) -> Vec<&P> {
        let mut result: Vec<&P> = vec![];
        self.find_within_range(target, radius, &mut result);
        result
    }
}

impl<P, A: Accessor<P>, const K: usize, M> KdTree<P, A, K, M> {
    /// Call `visit` with every value inside `region` (bounds included).
    pub fn visit_within_region<'a, F: FnMut(&'a P)>(
        &'a self,
        region: &Region<A::Scalar, K>,
        mut visit: F,
    ) {
        let Some(root) = self.root else {
            return;
        };

        let mut stack: TinyVec<[(usize, usize); 32]> = TinyVec::new();
        stack.push((root, 0));

        while let Some((idx, depth)) = stack.pop() {
            let node = self.node(idx);
            let coords = self.coords(&node.value);
            if region.contains(&coords) {
                visit(&node.value);
            }

            // queue search in halves that intersect the query
            let axis = depth % K;
            if region.max[axis] >= coords[axis] {
                if let Some(right) = node.right {
                    stack.push((right, depth + 1));
                }
            }
            if region.min[axis] <= coords[axis] {
                if let Some(left) = node.left {
                    stack.push((left, depth + 1));
                }
            }
        }
    }

    /// The number of values inside `region`.
    pub fn count_within_region(&self, region: &Region<A::Scalar, K>) -> usize {
        let mut count = 0;
        self.visit_within_region(region, |_| count += 1);
        count
    }

    /// Append every value inside `region` to `sink`.
    pub fn find_within_region<'a, E: Extend<&'a P>>(
        &'a self,
        region: &Region<A::Scalar, K>,
        sink: &mut E,
    ) {
        self.visit_within_region(region, |value| sink.extend(std::iter::once(value)));
    }
}

//! The tree container: arena storage, insertion and deletion.

use std::fmt;

use tinyvec::TinyVec;

use crate::error::{KdTreeError, Result};
use crate::kdtree::accessor::Accessor;
use crate::kdtree::distance::EuclideanDistance;
use crate::kdtree::node::{slot, Node, NodeId, Side};
use crate::r#type::widen;

/// A dynamic K-D tree over points of type `P`.
///
/// Coordinates are read through the accessor `A`; `K` is the number of dimensions and `M` the
/// distance metric used by nearest-neighbor and radius queries.
///
/// Nodes live in an arena owned by the tree. Every node partitions its subtree along the axis
/// `depth % K`: values in the left subtree are `<=` the node's coordinate on that axis and values
/// in the right subtree are `>=`. Insertion never rebalances, so the shape follows insertion
/// order until [`optimise`][KdTree::optimise] is called.
///
/// ```
/// use kdtree_index::kdtree::{ArrayAccessor, KdTree};
///
/// let mut tree = KdTree::<[f64; 2], _, 2>::new(ArrayAccessor);
/// tree.insert([0., 0.]);
/// tree.insert([2., 2.]);
/// tree.insert([5., 1.]);
///
/// let (nearest, distance) = tree.find_nearest(&[4., 1.], f64::INFINITY).unwrap();
/// assert_eq!(nearest, &[5., 1.]);
/// assert_eq!(distance, 1.);
/// ```
#[derive(Clone)]
pub struct KdTree<P, A, const K: usize, M = EuclideanDistance> {
    pub(crate) nodes: Vec<Option<Node<P>>>,
    pub(crate) generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    pub(crate) root: Option<usize>,
    len: usize,
    pub(crate) accessor: A,
    pub(crate) metric: M,
}

impl<P, A, const K: usize, M: fmt::Debug> fmt::Debug for KdTree<P, A, K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdTree")
            .field("dimensions", &K)
            .field("len", &self.len)
            .field("slots", &self.nodes.len())
            .field("free_list", &self.free_list.len())
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

impl<P, A: Accessor<P>, const K: usize> KdTree<P, A, K> {
    /// Create an empty tree using Euclidean distance.
    ///
    /// Panics if `K` is zero; use [`try_new`][KdTree::try_new] to get an error instead.
    pub fn new(accessor: A) -> Self {
        Self::with_metric(accessor, EuclideanDistance)
    }

    /// Create an empty tree using Euclidean distance, failing if `K` is zero.
    pub fn try_new(accessor: A) -> Result<Self> {
        Self::try_with_metric(accessor, EuclideanDistance)
    }
}

impl<P, A, const K: usize, M> KdTree<P, A, K, M> {
    /// Create an empty tree with a custom distance metric.
    ///
    /// Panics if `K` is zero.
    pub fn with_metric(accessor: A, metric: M) -> Self {
        assert!(K > 0, "A KD-tree needs at least one dimension");
        Self::empty(accessor, metric)
    }

    /// Create an empty tree with a custom distance metric, failing if `K` is zero.
    pub fn try_with_metric(accessor: A, metric: M) -> Result<Self> {
        if K == 0 {
            return Err(KdTreeError::ZeroDimensions);
        }
        Ok(Self::empty(accessor, metric))
    }

    pub(crate) fn empty(accessor: A, metric: M) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: None,
            len: 0,
            accessor,
            metric,
        }
    }

    /// The number of values stored in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The coordinate accessor of this tree.
    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// The distance metric of this tree.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Returns `true` if `id` still refers to a live value.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.generation())
            .unwrap_or(false)
    }

    /// The value behind `id`, or `None` if the handle is stale.
    pub fn get(&self, id: NodeId) -> Option<&P> {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .filter(|n| n.generation == id.generation())
            .map(|n| &n.value)
    }

    /// The number of levels of the tree; `0` when empty.
    pub fn height(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut height = 0;
        let mut stack: TinyVec<[(usize, usize); 32]> = TinyVec::new();
        stack.push((root, 1));
        while let Some((idx, level)) = stack.pop() {
            height = height.max(level);
            let node = self.node(idx);
            if let Some(left) = node.left {
                stack.push((left, level + 1));
            }
            if let Some(right) = node.right {
                stack.push((right, level + 1));
            }
        }
        height
    }

    /// Remove every value. All handles become stale.
    pub fn clear(&mut self) {
        self.take_values();
    }

    #[inline]
    pub(crate) fn node(&self, idx: usize) -> &Node<P> {
        slot(&self.nodes, idx)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, idx: usize) -> &mut Node<P> {
        self.nodes[idx].as_mut().expect("dangling slot")
    }

    #[inline]
    pub(crate) fn id_of(&self, idx: usize) -> NodeId {
        NodeId::from_slot(idx, self.node(idx).generation)
    }

    /// Place `value` in a free slot, reusing freed slots under a new generation.
    pub(crate) fn alloc(&mut self, value: P, parent: Option<usize>) -> usize {
        let idx = self.claim_slot(value, parent);
        self.len += 1;
        idx
    }

    fn claim_slot(&mut self, value: P, parent: Option<usize>) -> usize {
        if let Some(idx) = self.free_list.pop() {
            // slots on the free list are below the last generation
            let generation = self.generations[idx] + 1;
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(value, generation, parent));
            idx
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(value, generation, parent)));
            self.generations.push(generation);
            self.nodes.len() - 1
        }
    }

    /// A slot whose generation is exhausted is never handed out again.
    #[inline]
    fn is_retired(&self, idx: usize) -> bool {
        self.generations[idx] == u32::MAX
    }

    fn free(&mut self, idx: usize) -> P {
        let node = self.nodes[idx].take().expect("dangling slot");
        if !self.is_retired(idx) {
            self.free_list.push(idx);
        }
        self.len -= 1;
        node.value
    }

    /// Invalidate handles to the live node at `idx`.
    ///
    /// The node moves to a fresh slot when its own slot has no generation left.
    fn bump_generation(&mut self, idx: usize) {
        if self.is_retired(idx) {
            self.relocate(idx);
            return;
        }
        let generation = self.generations[idx] + 1;
        self.generations[idx] = generation;
        self.node_mut(idx).generation = generation;
    }

    /// Move the node at `idx` to another slot, relinking its parent and children. `idx` is
    /// left empty and off the free list.
    fn relocate(&mut self, idx: usize) {
        let Node {
            value,
            parent,
            left,
            right,
            ..
        } = self.nodes[idx].take().expect("dangling slot");
        let new = self.claim_slot(value, parent);
        let node = self.node_mut(new);
        node.left = left;
        node.right = right;

        match parent {
            Some(parent) => {
                let parent = self.node_mut(parent);
                if parent.left == Some(idx) {
                    parent.left = Some(new);
                } else {
                    parent.right = Some(new);
                }
            }
            None => self.root = Some(new),
        }
        for child in [left, right].into_iter().flatten() {
            self.node_mut(child).parent = Some(new);
        }
        tracing::trace!(from = idx, to = new, "retired exhausted slot");
    }

    /// Unlink a leaf from its parent (or from the root).
    fn detach(&mut self, idx: usize) {
        match self.node(idx).parent {
            Some(parent) => {
                let parent = self.node_mut(parent);
                if parent.left == Some(idx) {
                    parent.left = None;
                } else {
                    parent.right = None;
                }
            }
            None => self.root = None,
        }
    }

    fn swap_values(&mut self, a: usize, b: usize) {
        debug_assert_ne!(a, b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi);
        let lo = head[lo].as_mut().expect("dangling slot");
        let hi = tail[0].as_mut().expect("dangling slot");
        std::mem::swap(&mut lo.value, &mut hi.value);
    }

    fn depth_of(&self, mut idx: usize) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.node(idx).parent {
            depth += 1;
            idx = parent;
        }
        depth
    }

    /// Move every value out of the arena, leaving an empty tree whose slots are all free.
    pub(crate) fn take_values(&mut self) -> Vec<P> {
        let values: Vec<P> = self
            .nodes
            .iter_mut()
            .filter_map(|slot| slot.take().map(|node| node.value))
            .collect();
        self.free_list = (0..self.nodes.len())
            .rev()
            .filter(|&idx| !self.is_retired(idx))
            .collect();
        self.root = None;
        self.len = 0;
        values
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Extremum {
    Min,
    Max,
}

impl<P, A: Accessor<P>, const K: usize, M> KdTree<P, A, K, M> {
    #[inline]
    pub(crate) fn coordinate(&self, value: &P, axis: usize) -> A::Scalar {
        self.accessor.coordinate(value, axis)
    }

    /// All K coordinates of `value`.
    #[inline]
    pub(crate) fn coords(&self, value: &P) -> [A::Scalar; K] {
        std::array::from_fn(|axis| self.accessor.coordinate(value, axis))
    }

    /// All K coordinates of `value`, widened for distance computations.
    #[inline]
    pub(crate) fn widened(&self, value: &P) -> [f64; K] {
        std::array::from_fn(|axis| widen(self.accessor.coordinate(value, axis)))
    }

    /// Insert a value and return its handle.
    ///
    /// The value descends from the root, going left when its coordinate on the node's axis is
    /// smaller and right otherwise (ties go right). Duplicates are stored as distinct nodes.
    pub fn insert(&mut self, value: P) -> NodeId {
        let mut link = None;
        let mut cursor = self.root;
        let mut depth = 0;
        while let Some(idx) = cursor {
            let axis = depth % K;
            let node = self.node(idx);
            let side = if self.coordinate(&value, axis) < self.coordinate(&node.value, axis) {
                Side::Left
            } else {
                Side::Right
            };
            link = Some((idx, side));
            cursor = node.child(side);
            depth += 1;
        }

        let idx = self.alloc(value, link.map(|(parent, _)| parent));
        match link {
            Some((parent, side)) => *self.node_mut(parent).child_mut(side) = Some(idx),
            None => self.root = Some(idx),
        }
        self.id_of(idx)
    }

    /// Erase one value equal to `value`. Returns the number of values removed (0 or 1).
    ///
    /// Handles to the erased value and to the slot that received a replacement value go stale.
    pub fn erase(&mut self, value: &P) -> usize
    where
        P: PartialEq,
    {
        match self.locate(value, |candidate| candidate == value) {
            Some((idx, depth)) => {
                self.remove_at(idx, depth);
                tracing::trace!(len = self.len, "erased value");
                1
            }
            None => {
                tracing::trace!("erase found no matching value");
                0
            }
        }
    }

    /// Remove the value behind `id` and return it.
    pub fn remove(&mut self, id: NodeId) -> Result<P> {
        if !self.is_alive(id) {
            return Err(KdTreeError::StaleNode(id));
        }
        let idx = id.idx();
        let depth = self.depth_of(idx);
        let value = self.remove_at(idx, depth);
        tracing::trace!(?id, len = self.len, "removed node");
        Ok(value)
    }

    /// Find a value whose coordinates equal those of `value` on every axis.
    pub fn find(&self, value: &P) -> Option<NodeId> {
        let target = self.coords(value);
        self.locate(value, |candidate| {
            (0..K).all(|axis| self.coordinate(candidate, axis) == target[axis])
        })
        .map(|(idx, _)| self.id_of(idx))
    }

    /// Find a value equal to `value`.
    pub fn find_exact(&self, value: &P) -> Option<NodeId>
    where
        P: PartialEq,
    {
        self.locate(value, |candidate| candidate == value)
            .map(|(idx, _)| self.id_of(idx))
    }

    /// Keep only the values for which `keep` returns `true`, then rebuild the tree balanced.
    ///
    /// All handles become stale.
    #[tracing::instrument(level = "debug", skip_all, fields(len = self.len))]
    pub fn retain<F: FnMut(&P) -> bool>(&mut self, mut keep: F) {
        let mut values = self.take_values();
        values.retain(|value| keep(value));
        self.rebuild(values);
    }

    /// Search for a node matching `is_match`, descending as insertion would.
    ///
    /// On an exact tie on the split axis both subtrees may hold the value (deletion can promote
    /// equal coordinates into a left subtree), so both are searched, right first.
    fn locate<F: FnMut(&P) -> bool>(&self, value: &P, mut is_match: F) -> Option<(usize, usize)> {
        let target = self.coords(value);
        let mut stack: TinyVec<[(usize, usize); 32]> = TinyVec::new();
        stack.push((self.root?, 0));
        while let Some((idx, depth)) = stack.pop() {
            let node = self.node(idx);
            if is_match(&node.value) {
                return Some((idx, depth));
            }
            let axis = depth % K;
            let split = self.coordinate(&node.value, axis);
            if target[axis] < split {
                if let Some(left) = node.left {
                    stack.push((left, depth + 1));
                }
            } else if target[axis] > split {
                if let Some(right) = node.right {
                    stack.push((right, depth + 1));
                }
            } else {
                if let Some(left) = node.left {
                    stack.push((left, depth + 1));
                }
                if let Some(right) = node.right {
                    stack.push((right, depth + 1));
                }
            }
        }
        None
    }

    /// Remove the value held at `idx`, which sits at `depth`.
    ///
    /// A node with children takes over the value of its replacement (the minimum along its axis
    /// from the right subtree, or else the maximum from the left subtree) and the removal moves
    /// on to the replacement, until a leaf is unlinked.
    fn remove_at(&mut self, mut idx: usize, mut depth: usize) -> P {
        loop {
            let node = self.node(idx);
            let axis = depth % K;
            let replacement = if let Some(right) = node.right {
                Some(self.extreme(right, depth + 1, axis, Extremum::Min))
            } else {
                node.left
                    .map(|left| self.extreme(left, depth + 1, axis, Extremum::Max))
            };

            match replacement {
                Some((next, next_depth)) => {
                    self.swap_values(idx, next);
                    self.bump_generation(idx);
                    idx = next;
                    depth = next_depth;
                }
                None => {
                    self.detach(idx);
                    return self.free(idx);
                }
            }
        }
    }

    /// The node holding the smallest (or largest) coordinate on `axis` within the subtree at
    /// `subroot`, together with its depth. The first such node in pre-order wins ties.
    fn extreme(
        &self,
        subroot: usize,
        depth: usize,
        axis: usize,
        extremum: Extremum,
    ) -> (usize, usize) {
        let mut best = (
            subroot,
            depth,
            self.coordinate(&self.node(subroot).value, axis),
        );
        let mut stack: TinyVec<[(usize, usize); 32]> = TinyVec::new();
        stack.push((subroot, depth));
        while let Some((idx, depth)) = stack.pop() {
            let node = self.node(idx);
            let c = self.coordinate(&node.value, axis);
            let better = match extremum {
                Extremum::Min => c < best.2,
                Extremum::Max => c > best.2,
            };
            if better {
                best = (idx, depth, c);
            }

            // a subtree split on the same axis can only improve on one side
            let same_axis = depth % K == axis;
            if !(same_axis && extremum == Extremum::Min) {
                if let Some(right) = node.right {
                    stack.push((right, depth + 1));
                }
            }
            if !(same_axis && extremum == Extremum::Max) {
                if let Some(left) = node.left {
                    stack.push((left, depth + 1));
                }
            }
        }
        (best.0, best.1)
    }
}

impl<P, A: Accessor<P>, const K: usize, M> Extend<P> for KdTree<P, A, K, M> {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

//! Utilities to traverse the KdTree structure.
//!
//! [`Iter`] and [`Cursor`] walk the values in order: left subtree, node, right subtree. The order
//! follows the current shape of the tree, so it changes when the tree is rebuilt. [`NodeRef`]
//! gives manual access to the tree's structure.

use std::iter::FusedIterator;

use crate::kdtree::node::{slot, NodeId, Slots};
use crate::kdtree::KdTree;

fn leftmost<P>(nodes: &Slots<P>, mut idx: usize) -> usize {
    while let Some(left) = slot(nodes, idx).left {
        idx = left;
    }
    idx
}

fn rightmost<P>(nodes: &Slots<P>, mut idx: usize) -> usize {
    while let Some(right) = slot(nodes, idx).right {
        idx = right;
    }
    idx
}

/// The in-order successor of `idx`, climbing parent links when there is no right subtree.
fn successor<P>(nodes: &Slots<P>, idx: usize) -> Option<usize> {
    let node = slot(nodes, idx);
    if let Some(right) = node.right {
        return Some(leftmost(nodes, right));
    }
    let mut child = idx;
    let mut parent = node.parent;
    while let Some(p) = parent {
        let parent_node = slot(nodes, p);
        if parent_node.left == Some(child) {
            return Some(p);
        }
        child = p;
        parent = parent_node.parent;
    }
    None
}

/// The in-order predecessor of `idx`; the mirror image of [`successor`].
fn predecessor<P>(nodes: &Slots<P>, idx: usize) -> Option<usize> {
    let node = slot(nodes, idx);
    if let Some(left) = node.left {
        return Some(rightmost(nodes, left));
    }
    let mut child = idx;
    let mut parent = node.parent;
    while let Some(p) = parent {
        let parent_node = slot(nodes, p);
        if parent_node.right == Some(child) {
            return Some(p);
        }
        child = p;
        parent = parent_node.parent;
    }
    None
}

impl<P, A, const K: usize, M> KdTree<P, A, K, M> {
    /// Iterate over all values in order. Use `.rev()` to walk from the back.
    pub fn iter(&self) -> Iter<'_, P> {
        Iter {
            nodes: &self.nodes,
            front: self.root.map(|root| leftmost(&self.nodes, root)),
            back: self.root.map(|root| rightmost(&self.nodes, root)),
            remaining: self.len(),
        }
    }

    /// A cursor on the first value, or on the end position if the tree is empty.
    pub fn cursor_front(&self) -> Cursor<'_, P> {
        Cursor {
            nodes: &self.nodes,
            root: self.root,
            current: self.root.map(|root| leftmost(&self.nodes, root)),
        }
    }

    /// A cursor on the last value, or on the end position if the tree is empty.
    pub fn cursor_back(&self) -> Cursor<'_, P> {
        Cursor {
            nodes: &self.nodes,
            root: self.root,
            current: self.root.map(|root| rightmost(&self.nodes, root)),
        }
    }

    /// A cursor on the value behind `id`, or `None` if the handle is stale.
    pub fn cursor_at(&self, id: NodeId) -> Option<Cursor<'_, P>> {
        if !self.is_alive(id) {
            return None;
        }
        Some(Cursor {
            nodes: &self.nodes,
            root: self.root,
            current: Some(id.idx()),
        })
    }

    /// Access the root node of the tree for manual traversal.
    pub fn root(&self) -> Option<NodeRef<'_, P, K>> {
        self.root.map(|idx| NodeRef {
            nodes: &self.nodes,
            idx,
            depth: 0,
        })
    }
}

impl<'a, P, A, const K: usize, M> IntoIterator for &'a KdTree<P, A, K, M> {
    type Item = &'a P;
    type IntoIter = Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An in-order iterator over the values of a tree.
///
/// Forward and reverse iteration are mirror images: `iter().rev()` yields exactly the reverse
/// of `iter()`.
#[derive(Debug)]
pub struct Iter<'a, P> {
    nodes: &'a Slots<P>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<P> Clone for Iter<'_, P> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, P> Iterator for Iter<'a, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.front?;
        self.remaining -= 1;
        self.front = successor(self.nodes, idx);
        Some(&slot(self.nodes, idx).value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<P> DoubleEndedIterator for Iter<'_, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.back?;
        self.remaining -= 1;
        self.back = predecessor(self.nodes, idx);
        Some(&slot(self.nodes, idx).value)
    }
}

impl<P> ExactSizeIterator for Iter<'_, P> {}

impl<P> FusedIterator for Iter<'_, P> {}

/// A read-only position in the in-order sequence of a tree.
///
/// Besides the values, the sequence has an end position. Moving forward from the last value
/// reaches the end, and moving backward from the end reaches the last value. From the end,
/// [`move_next`][Cursor::move_next] wraps around to the first value, and
/// [`move_prev`][Cursor::move_prev] on the first value reaches the end.
#[derive(Debug)]
pub struct Cursor<'a, P> {
    nodes: &'a Slots<P>,
    root: Option<usize>,
    current: Option<usize>,
}

impl<P> Clone for Cursor<'_, P> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            root: self.root,
            current: self.current,
        }
    }
}

impl<'a, P> Cursor<'a, P> {
    /// The value under the cursor, or `None` at the end position.
    pub fn current(&self) -> Option<&'a P> {
        self.current.map(|idx| &slot(self.nodes, idx).value)
    }

    /// The handle of the value under the cursor, or `None` at the end position.
    pub fn id(&self) -> Option<NodeId> {
        self.current
            .map(|idx| NodeId::from_slot(idx, slot(self.nodes, idx).generation))
    }

    /// Returns `true` at the end position.
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    /// Step to the next value, or to the end position after the last value.
    pub fn move_next(&mut self) {
        self.current = match self.current {
            Some(idx) => successor(self.nodes, idx),
            None => self.root.map(|root| leftmost(self.nodes, root)),
        };
    }

    /// Step to the previous value, or to the end position before the first value.
    pub fn move_prev(&mut self) {
        self.current = match self.current {
            Some(idx) => predecessor(self.nodes, idx),
            None => self.root.map(|root| rightmost(self.nodes, root)),
        };
    }
}

/// A node of the tree, for manual traversal.
#[derive(Debug)]
pub struct NodeRef<'a, P, const K: usize> {
    nodes: &'a Slots<P>,
    idx: usize,
    depth: usize,
}

impl<P, const K: usize> Clone for NodeRef<'_, P, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, const K: usize> Copy for NodeRef<'_, P, K> {}

impl<'a, P, const K: usize> NodeRef<'a, P, K> {
    /// The value stored in this node.
    pub fn value(&self) -> &'a P {
        &slot(self.nodes, self.idx).value
    }

    /// The handle of this node.
    pub fn id(&self) -> NodeId {
        NodeId::from_slot(self.idx, slot(self.nodes, self.idx).generation)
    }

    /// The distance from the root; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The axis the children of this node are split over: `depth % K`.
    pub fn axis(&self) -> usize {
        self.depth % K
    }

    /// The child holding values that are not greater than this one on [`axis`][NodeRef::axis].
    pub fn left_child(&self) -> Option<NodeRef<'a, P, K>> {
        slot(self.nodes, self.idx).left.map(|idx| self.at(idx, self.depth + 1))
    }

    /// The child holding values that are not smaller than this one on [`axis`][NodeRef::axis].
    pub fn right_child(&self) -> Option<NodeRef<'a, P, K>> {
        slot(self.nodes, self.idx).right.map(|idx| self.at(idx, self.depth + 1))
    }

    /// The parent of this node, or `None` for the root.
    pub fn parent(&self) -> Option<NodeRef<'a, P, K>> {
        slot(self.nodes, self.idx)
            .parent
            .map(|idx| self.at(idx, self.depth - 1))
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        slot(self.nodes, self.idx).is_leaf()
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    fn at(&self, idx: usize, depth: usize) -> Self {
        Self {
            nodes: self.nodes,
            idx,
            depth,
        }
    }
}

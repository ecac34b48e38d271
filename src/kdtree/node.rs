//! Arena nodes and the handles that refer to them.

/// Handle to a node of a [`KdTree`](crate::kdtree::KdTree).
///
/// A small, copyable pair of a slot index and a generation counter. Handles are returned by
/// [`KdTree::insert`](crate::kdtree::KdTree::insert) and by the search methods ending in `_id`,
/// and may be kept across mutations of the tree.
///
/// ## Liveness
///
/// A handle is alive while its slot is occupied and holds the same generation. It goes stale when
///
/// - the value it refers to is erased or removed,
/// - the deletion of another value promotes a replacement value into its slot,
/// - the tree is rebuilt by [`optimise`](crate::kdtree::KdTree::optimise) or cleared.
///
/// Use [`KdTree::is_alive`](crate::kdtree::KdTree::is_alive) to check a handle. Stale handles never
/// alias a different value because the generation must match.
///
/// The generation of a slot never decreases. A slot that reaches `u32::MAX` is retired and never
/// reused, so a stale handle can never become alive again.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_slot(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// Which child of a node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// A stored value together with its links in the arena.
///
/// Children are owned through the tree's arena: a slot index appears as the child of exactly one
/// node (or as the root). `parent` is a back-reference only.
#[derive(Clone, Debug)]
pub(crate) struct Node<P> {
    pub(crate) value: P,
    pub(crate) generation: u32,
    pub(crate) parent: Option<usize>,
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
}

impl<P> Node<P> {
    pub(crate) fn new(value: P, generation: u32, parent: Option<usize>) -> Self {
        Self {
            value,
            generation,
            parent,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn child_mut(&mut self, side: Side) -> &mut Option<usize> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// The arena as seen by read-only traversals.
pub(crate) type Slots<P> = [Option<Node<P>>];

/// Access an occupied slot; panics if the slot was freed.
#[inline]
pub(crate) fn slot<P>(nodes: &Slots<P>, idx: usize) -> &Node<P> {
    nodes[idx].as_ref().expect("dangling slot")
}

//! Shared fixtures and checks for the tests of this crate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::kdtree::{Accessor, DistanceMetric, KdTree, NodeRef};
use crate::r#type::widen;


pub(crate) type Triplet = [i32; 3];

pub(crate) type TripletAccessor = fn(&Triplet, usize) -> f64;

pub(crate) type TripletTree = KdTree<Triplet, TripletAccessor, 3>;

/// Reads a triplet coordinate as a double.
pub(crate) fn tac(t: &Triplet, k: usize) -> f64 {
    f64::from(t[k])
}

pub(crate) fn triplet_tree() -> TripletTree {
    KdTree::new(tac as TripletAccessor)
}

/// The ten points of the classic libkdtree++ walkthrough, in insertion order.
pub(crate) fn triplets() -> Vec<Triplet> {
    vec![
        [5, 4, 0],
        [4, 2, 1],
        [7, 6, 9],
        [2, 2, 1],
        [8, 0, 5],
        [5, 7, 0],
        [3, 3, 8],
        [9, 7, 3],
        [2, 2, 6],
        [2, 0, 6],
    ]
}

pub(crate) fn random_points<const K: usize>(seed: u64, n: usize, extent: f64) -> Vec<[f64; K]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| std::array::from_fn(|_| rng.gen_range(-extent..extent)))
        .collect()
}

/// Random integer points on a small grid, so that ties and duplicates are common.
pub(crate) fn random_grid_points<const K: usize>(seed: u64, n: usize, extent: i32) -> Vec<[i32; K]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| std::array::from_fn(|_| rng.gen_range(-extent..=extent)))
        .collect()
}

/// Distance between two points as the tree computes it.
pub(crate) fn distance<P, A, const K: usize, M>(tree: &KdTree<P, A, K, M>, a: &P, b: &P) -> f64
where
    A: Accessor<P>,
    M: DistanceMetric,
{
    let a: [f64; K] = std::array::from_fn(|i| widen(tree.accessor().coordinate(a, i)));
    let b: [f64; K] = std::array::from_fn(|i| widen(tree.accessor().coordinate(b, i)));
    tree.metric().distance(&a, &b)
}

/// Brute-force radius query over a point set.
pub(crate) fn brute_within<'a, P, A, const K: usize, M>(
    tree: &KdTree<P, A, K, M>,
    points: &'a [P],
    target: &P,
    radius: f64,
) -> Vec<&'a P>
where
    A: Accessor<P>,
    M: DistanceMetric,
{
    points
        .iter()
        .filter(|p| distance(tree, p, target) <= radius)
        .collect()
}

/// Brute-force nearest distance over a point set.
pub(crate) fn brute_nearest_distance<P, A, const K: usize, M>(
    tree: &KdTree<P, A, K, M>,
    points: &[P],
    target: &P,
) -> Option<f64>
where
    A: Accessor<P>,
    M: DistanceMetric,
{
    points
        .iter()
        .map(|p| distance(tree, p, target))
        .min_by(|a, b| a.partial_cmp(b).unwrap())
}

/// Sorted copy of a multiset of values.
pub(crate) fn sorted<T: Ord + Clone>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut values: Vec<T> = values.into_iter().collect();
    values.sort();
    values
}

/// Assert the partition invariant, parent links and the value count of a tree.
pub(crate) fn assert_invariants<P, A, const K: usize, M>(tree: &KdTree<P, A, K, M>)
where
    P: std::fmt::Debug,
    A: Accessor<P>,
{
    let Some(root) = tree.root() else {
        assert!(tree.is_empty(), "empty root but len {}", tree.len());
        assert_eq!(tree.iter().count(), 0);
        return;
    };
    assert!(root.parent().is_none(), "root has no parent");

    let mut visited = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visited += 1;
        assert!(tree.is_alive(node.id()), "every linked node is alive");
        let axis = node.axis();
        let split = tree.accessor().coordinate(node.value(), axis);

        if let Some(left) = node.left_child() {
            assert_eq!(left.parent().map(|p| p.id()), Some(node.id()));
            for value in subtree_values(left) {
                assert!(
                    tree.accessor().coordinate(value, axis) <= split,
                    "{value:?} left of {:?} on axis {axis}",
                    node.value()
                );
            }
            stack.push(left);
        }
        if let Some(right) = node.right_child() {
            assert_eq!(right.parent().map(|p| p.id()), Some(node.id()));
            for value in subtree_values(right) {
                assert!(
                    tree.accessor().coordinate(value, axis) >= split,
                    "{value:?} right of {:?} on axis {axis}",
                    node.value()
                );
            }
            stack.push(right);
        }
    }

    assert_eq!(visited, tree.len(), "linked nodes match len");
    assert_eq!(tree.iter().count(), tree.len(), "iteration matches len");
}

fn subtree_values<'a, P, const K: usize>(node: NodeRef<'a, P, K>) -> Vec<&'a P> {
    let mut values = vec![];
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        values.push(node.value());
        stack.extend(node.left_child());
        stack.extend(node.right_child());
    }
    values
}

/// Assert that reverse iteration mirrors forward iteration, through both `Iter` and `Cursor`.
pub(crate) fn assert_mirror<P, A, const K: usize, M>(tree: &KdTree<P, A, K, M>)
where
    P: PartialEq + std::fmt::Debug,
{
    let forward: Vec<&P> = tree.iter().collect();
    let mut backward: Vec<&P> = tree.iter().rev().collect();
    backward.reverse();
    assert_eq!(forward, backward, "iter().rev() mirrors iter()");

    let mut cursor = tree.cursor_back();
    let mut stepped = vec![];
    while let Some(value) = cursor.current() {
        stepped.push(value);
        cursor.move_prev();
    }
    stepped.reverse();
    assert_eq!(forward, stepped, "cursor walks mirror iter()");
}

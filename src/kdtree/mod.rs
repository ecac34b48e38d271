//! A dynamic K-D tree: insert, erase, rebalance, nearest-neighbor and range queries over points
//! of any type, read through a coordinate accessor.

#![warn(missing_docs)]

mod accessor;
mod builder;
mod distance;
mod node;
mod region;
mod search;
mod traversal;
mod tree;

pub use accessor::{Accessor, ArrayAccessor, CoordAccessor};
pub use builder::KdTreeBuilder;
pub use distance::{ChebyshevDistance, DistanceMetric, EuclideanDistance, ManhattanDistance};
pub use node::NodeId;
pub use region::Region;
pub use traversal::{Cursor, Iter, NodeRef};
pub use tree::KdTree;

use thiserror::Error;

use crate::kdtree::NodeId;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KdTreeError {
    /// A tree was requested over zero dimensions.
    #[error("A KD-tree needs at least one dimension")]
    ZeroDimensions,

    /// The handle no longer refers to a live node.
    #[error("Node handle {0:?} is stale")]
    StaleNode(NodeId),
}

pub type Result<T> = std::result::Result<T, KdTreeError>;

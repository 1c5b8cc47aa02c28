//! Store errors

use scriptree_model::{ModelError, NodeId};

/// Errors raised by table operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Node row absent
    #[error("node not found: {0}")]
    NodeMissing(NodeId),

    /// Node id already present
    #[error("node already exists: {0}")]
    DuplicateNode(NodeId),

    /// Node already has an incoming edge
    #[error("node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),

    /// Sibling sort indices are not exactly `1..=N`
    #[error("sibling order under {parent} is not dense: {sorts:?}")]
    SparseSiblings {
        /// Parent whose children violate density
        parent: NodeId,
        /// Observed sorts, ascending
        sorts: Vec<u32>,
    },

    /// Property payload could not be encoded or decoded
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Snapshot file could not be read or written
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON
    #[error("snapshot format invalid: {0}")]
    Format(#[from] serde_json::Error),
}

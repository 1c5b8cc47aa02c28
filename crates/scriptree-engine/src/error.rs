//! Engine error taxonomy
//!
//! Every variant aborts the enclosing unit of work. Nothing is retried
//! here; retry is a caller policy.

use scriptree_compiler::CompileError;
use scriptree_model::{ModelError, NodeId, WorkspaceId};
use scriptree_store::StoreError;

/// Broad error class, for callers that map errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Compatibility,
    Consistency,
    MissingReference,
    Validation,
    Denied,
    Internal,
}

/// Mutation engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Referenced node absent
    #[error("{what} not found: {id}")]
    NotFound {
        /// What was looked up ("element", "source parent", ...)
        what: &'static str,
        /// Identifier that missed
        id: NodeId,
    },

    /// Paste or move type rule violated
    #[error("{source_class} cannot be placed under {target_class}: {reason}")]
    Compatibility {
        /// Class of the node being placed
        source_class: String,
        /// Class of the intended parent
        target_class: String,
        /// Which rule rejected the pairing
        reason: &'static str,
    },

    /// Sibling order broken after a mutation; indicates an engine defect
    #[error("sibling order broken under {parent}: {sorts:?}")]
    Consistency {
        /// Parent whose children are not dense
        parent: NodeId,
        /// Observed sorts
        sorts: Vec<u32>,
    },

    /// Malformed request
    #[error("validation failed: {0}")]
    Validation(String),

    /// Permission check refused the operation
    #[error("permission {permission} denied for {actor} in workspace {workspace:?}")]
    Denied {
        /// Permission code requested
        permission: &'static str,
        /// Caller
        actor: String,
        /// Workspace the decision was made for
        workspace: Option<WorkspaceId>,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Table or payload failure
    #[error(transparent)]
    Store(StoreError),

    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl EngineError {
    /// Error class of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Compatibility { .. } => ErrorKind::Compatibility,
            Self::Consistency { .. } => ErrorKind::Consistency,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Denied { .. } => ErrorKind::Denied,
            Self::Config(_) | Self::Store(_) => ErrorKind::Internal,
            Self::Compile(err) => match err {
                CompileError::NotFound { .. } => ErrorKind::NotFound,
                CompileError::MissingReference { .. } => ErrorKind::MissingReference,
                CompileError::CyclicSnippet(_) | CompileError::EmptyScript(_) => {
                    ErrorKind::Validation
                }
                CompileError::Decode(_) => ErrorKind::Internal,
            },
        }
    }

    /// Shorthand for a missing element
    #[inline]
    #[must_use]
    pub fn element_not_found(id: NodeId) -> Self {
        Self::NotFound {
            what: "element",
            id,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NodeMissing(id) => Self::element_not_found(id),
            StoreError::SparseSiblings { parent, sorts } => Self::Consistency { parent, sorts },
            other => Self::Store(other),
        }
    }
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        Self::Store(StoreError::Model(err))
    }
}

/// Engine result alias
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_taxonomy() {
        let id = NodeId::new();
        let err: EngineError = StoreError::NodeMissing(id).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: EngineError = StoreError::SparseSiblings {
            parent: id,
            sorts: vec![1, 3],
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Consistency);

        let err: EngineError = StoreError::AlreadyAttached(id).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn compile_errors_keep_their_class() {
        let err: EngineError = CompileError::MissingReference {
            kind: scriptree_compiler::ReferenceKind::Snippet,
            referrer: NodeId::new(),
            reference: "<unset>".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::MissingReference);

        let err: EngineError = CompileError::CyclicSnippet(NodeId::new()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn messages_are_lowercase() {
        let err = EngineError::Validation("target index must not be negative".into());
        assert_eq!(
            err.to_string(),
            "validation failed: target index must not be negative"
        );
    }
}

//! Compile errors
//!
//! Compilation is all-or-nothing: any of these aborts the whole compile and
//! no partial document is returned.

use scriptree_model::NodeId;
use scriptree_store::StoreError;
use std::fmt;

/// Kind of unresolved reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Snippet collection named by a snippet sampler
    Snippet,
    /// Database engine named by a SQL sampler
    DatabaseEngine,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snippet => f.write_str("snippet"),
            Self::DatabaseEngine => f.write_str("database engine"),
        }
    }
}

/// Errors raised while compiling a tree
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Root node or variable dataset absent
    #[error("{what} not found: {id}")]
    NotFound {
        /// What was looked up
        what: &'static str,
        /// Identifier that missed
        id: String,
    },

    /// Reference unset or pointing at nothing
    #[error("missing {kind} reference from {referrer}: {reference}")]
    MissingReference {
        /// Snippet or database engine
        kind: ReferenceKind,
        /// Node holding the reference
        referrer: NodeId,
        /// Referenced id as stored, or `<unset>`
        reference: String,
    },

    /// Snippet expansion reached a snippet already being expanded
    #[error("snippet {0} references itself")]
    CyclicSnippet(NodeId),

    /// The root itself was disabled or excluded by the requested scope
    #[error("nothing to compile: {0} is disabled or out of scope")]
    EmptyScript(NodeId),

    /// Stored payload could not be decoded
    #[error(transparent)]
    Decode(#[from] StoreError),
}

impl CompileError {
    pub(crate) fn node_not_found(id: NodeId) -> Self {
        Self::NotFound {
            what: "element",
            id: id.to_string(),
        }
    }
}

/// Compiler result alias
pub type CompileResult<T> = Result<T, CompileError>;

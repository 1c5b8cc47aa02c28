//! Identifiers for nodes and workspaces
//!
//! Node identifiers are ULIDs: globally unique and sortable by creation time.
//! Allocation goes through [`IdGenerator`] so the surrounding system can plug
//! in its own identity service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique node identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Ulid);

impl NodeId {
    /// Generate a fresh identifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Underlying ULID
    #[inline]
    #[must_use]
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Workspace identifier, owned by the surrounding workspace administration
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub String);

impl WorkspaceId {
    /// Wrap an external workspace number
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// String form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh node identifiers
///
/// # Contract
/// - Every call returns an identifier never returned before
/// - Must be safe to share across threads
pub trait IdGenerator: Send + Sync {
    /// Allocate the next identifier
    fn next_id(&self) -> NodeId;

    /// Allocate a change-log entry id from the same sequence
    fn next_log_id(&self) -> Ulid {
        self.next_id().0
    }
}

/// Default generator backed by [`Ulid::new`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    #[inline]
    fn next_id(&self) -> NodeId {
        NodeId::new()
    }
}

//! Authorization descriptors
//!
//! Each operation declares the permission it needs and how to find the
//! workspace the decision applies to. The engine never authenticates;
//! the injected [`PermissionCheck`] makes the call.

use scriptree_model::{NodeId, WorkspaceId};
use std::collections::HashSet;

/// Permission codes, one per operation
pub mod permission {
    pub const CREATE: &str = "ELEMENT_CREATE";
    pub const MODIFY: &str = "ELEMENT_MODIFY";
    pub const REMOVE: &str = "ELEMENT_REMOVE";
    pub const MOVE: &str = "ELEMENT_MOVE";
    pub const DUPLICATE: &str = "ELEMENT_DUPLICATE";
    pub const PASTE: &str = "ELEMENT_PASTE";
    pub const STATE: &str = "ELEMENT_STATE";
    pub const COPY_TO_WORKSPACE: &str = "ELEMENT_COPY_TO_WORKSPACE";
    pub const MOVE_TO_WORKSPACE: &str = "ELEMENT_MOVE_TO_WORKSPACE";
    pub const QUERY: &str = "ELEMENT_QUERY";
    pub const COMPILE: &str = "SCRIPT_COMPILE";
}

/// How to find the workspace a permission is checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The caller's current workspace
    Caller,
    /// A named workspace
    Workspace(WorkspaceId),
    /// The workspace owning the tree that contains this node
    NodeWorkspace(NodeId),
}

/// Permission plus scope, attached to one operation call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub permission: &'static str,
    pub scope: Scope,
}

impl Authorization {
    #[inline]
    #[must_use]
    pub fn new(permission: &'static str, scope: Scope) -> Self {
        Self { permission, scope }
    }
}

/// Workspace-scope permission decision supplied by the host system
pub trait PermissionCheck: Send + Sync {
    /// Whether `actor` holds `permission` in `workspace`
    fn allows(&self, actor: &str, permission: &str, workspace: Option<&WorkspaceId>) -> bool;
}

/// Permits everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionCheck for AllowAll {
    fn allows(&self, _: &str, _: &str, _: Option<&WorkspaceId>) -> bool {
        true
    }
}

/// Permits only listed workspaces
#[derive(Debug, Default, Clone)]
pub struct WorkspaceAllowList {
    workspaces: HashSet<WorkspaceId>,
}

impl WorkspaceAllowList {
    #[must_use]
    pub fn new(workspaces: impl IntoIterator<Item = WorkspaceId>) -> Self {
        Self {
            workspaces: workspaces.into_iter().collect(),
        }
    }
}

impl PermissionCheck for WorkspaceAllowList {
    fn allows(&self, _: &str, _: &str, workspace: Option<&WorkspaceId>) -> bool {
        workspace.is_some_and(|w| self.workspaces.contains(w))
    }
}

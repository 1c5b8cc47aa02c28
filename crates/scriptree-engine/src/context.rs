//! Caller context carried through every operation

use scriptree_model::WorkspaceId;

/// Who is acting, and in which workspace
///
/// Replaces ambient request headers: the caller states the actor and the
/// workspace it is working in explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationContext {
    pub actor: Option<String>,
    pub workspace: Option<WorkspaceId>,
}

impl OperationContext {
    /// Context for `actor`
    #[must_use]
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            workspace: None,
        }
    }

    /// With current workspace
    #[inline]
    #[must_use]
    pub fn in_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(WorkspaceId::new(workspace));
        self
    }

    /// Actor name, or `fallback` when none was given
    #[must_use]
    pub fn actor_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.actor.as_deref().unwrap_or(fallback)
    }
}

//! Per-operation ancestry lookups
//!
//! Every change-log entry names the workspace, root, nearest case (group)
//! and parent of the affected node. Walking edges for each entry is
//! repetitive within one operation, so results are memoized here. The cache
//! lives only as long as one logical operation and must be cleared after a
//! reparent.

use scriptree_model::{NodeId, WorkspaceId};
use scriptree_store::Tables;
use std::collections::{HashMap, HashSet};

/// Resolved ancestry of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestry {
    pub workspace: Option<WorkspaceId>,
    pub root: NodeId,
    /// Nearest ancestor-or-self group
    pub case: Option<NodeId>,
    pub parent: Option<NodeId>,
}

/// Memo of [`Ancestry`] lookups for one operation
#[derive(Debug, Default)]
pub struct AncestryCache {
    resolved: HashMap<NodeId, Ancestry>,
}

impl AncestryCache {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ancestry of `id` as seen in `tables`
    pub fn resolve(&mut self, tables: &Tables, id: NodeId) -> Ancestry {
        if let Some(hit) = self.resolved.get(&id) {
            return hit.clone();
        }
        let root = tables.root_of(id);
        let ancestry = Ancestry {
            workspace: tables.node(root).and_then(|n| n.workspace.clone()),
            root,
            case: nearest_case(tables, id),
            parent: tables.parent_of(id),
        };
        self.resolved.insert(id, ancestry.clone());
        ancestry
    }

    /// Forget every memoized lookup
    pub fn clear(&mut self) {
        self.resolved.clear();
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

fn nearest_case(tables: &Tables, id: NodeId) -> Option<NodeId> {
    let mut seen = HashSet::new();
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        if !seen.insert(current) {
            return None;
        }
        if tables.node(current).is_some_and(scriptree_model::Node::is_group) {
            return Some(current);
        }
        cursor = tables.parent_of(current);
    }
    None
}

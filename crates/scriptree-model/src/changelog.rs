//! Change-log records
//!
//! A [`Change`] captures what one mutation step did to one node. The audit
//! emitter resolves its ancestry (workspace, root, case, parent) and stamps
//! actor and time to produce an append-only [`ChangeLogEntry`].

use crate::id::{NodeId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Property name used when auditing a node's display name
pub const NAME_FIELD: &str = "TestElement__name";
/// Property name used when auditing a node's description
pub const DESC_FIELD: &str = "TestElement__desc";
/// Property name used when auditing the enabled flag
pub const ENABLED_FIELD: &str = "TestElement__enabled";
/// Property name used when auditing the skipped marker
pub const SKIPPED_FIELD: &str = "TestElement__skipped";

/// Kind of audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
    Move,
    Order,
    Copy,
    Transfer,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Move => "MOVE",
            Self::Order => "ORDER",
            Self::Copy => "COPY",
            Self::Transfer => "TRANSFER",
        };
        f.write_str(s)
    }
}

/// What a single mutation step changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub kind: OperationKind,
    pub element: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    /// Source node or workspace (move, copy, transfer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_no: Option<String>,
    /// Target node or workspace (move, copy, transfer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_index: Option<u32>,
}

impl Change {
    fn bare(kind: OperationKind, element: NodeId) -> Self {
        Self {
            kind,
            element,
            prop_name: None,
            attr_name: None,
            old_value: None,
            new_value: None,
            source_no: None,
            target_no: None,
            source_index: None,
            target_index: None,
        }
    }

    /// Node created
    #[must_use]
    pub fn insert(element: NodeId) -> Self {
        Self::bare(OperationKind::Insert, element)
    }

    /// Node removed together with its subtree
    #[must_use]
    pub fn delete(element: NodeId) -> Self {
        Self::bare(OperationKind::Delete, element)
    }

    /// Field or property update
    #[must_use]
    pub fn update(
        element: NodeId,
        prop_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            prop_name: Some(prop_name.into()),
            old_value,
            new_value,
            ..Self::bare(OperationKind::Update, element)
        }
    }

    /// Per-key attribute update
    #[must_use]
    pub fn attr_update(
        element: NodeId,
        attr_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            attr_name: Some(attr_name.into()),
            old_value,
            new_value,
            ..Self::bare(OperationKind::Update, element)
        }
    }

    /// Reorder within the same parent
    #[must_use]
    pub fn order(element: NodeId, source_index: u32, target_index: u32) -> Self {
        Self {
            source_index: Some(source_index),
            target_index: Some(target_index),
            ..Self::bare(OperationKind::Order, element)
        }
    }

    /// Reparent
    #[must_use]
    pub fn moved(
        element: NodeId,
        source_parent: NodeId,
        source_index: u32,
        target_parent: NodeId,
        target_index: u32,
    ) -> Self {
        Self {
            source_no: Some(source_parent.to_string()),
            target_no: Some(target_parent.to_string()),
            source_index: Some(source_index),
            target_index: Some(target_index),
            ..Self::bare(OperationKind::Move, element)
        }
    }

    /// Clone created from `source`
    #[must_use]
    pub fn copy(clone: NodeId, source: NodeId) -> Self {
        Self {
            source_no: Some(source.to_string()),
            target_no: Some(clone.to_string()),
            ..Self::bare(OperationKind::Copy, clone)
        }
    }

    /// Tree re-homed to another workspace
    #[must_use]
    pub fn transfer(element: NodeId, from: &WorkspaceId, to: &WorkspaceId) -> Self {
        Self {
            source_no: Some(from.to_string()),
            target_no: Some(to.to_string()),
            ..Self::bare(OperationKind::Transfer, element)
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub log_id: Ulid,
    pub workspace: Option<WorkspaceId>,
    pub root: Option<NodeId>,
    /// Nearest enclosing group (the "case")
    pub case: Option<NodeId>,
    pub parent: Option<NodeId>,
    #[serde(flatten)]
    pub change: Change,
    pub operation_by: String,
    pub operation_time: DateTime<Utc>,
}

impl ChangeLogEntry {
    /// Operation kind shorthand
    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.change.kind
    }

    /// Affected node shorthand
    #[inline]
    #[must_use]
    pub fn element(&self) -> NodeId {
        self.change.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_carries_prop_and_values() {
        let id = NodeId::new();
        let c = Change::update(id, NAME_FIELD, Some("a".into()), Some("b".into()));
        assert_eq!(c.kind, OperationKind::Update);
        assert_eq!(c.prop_name.as_deref(), Some(NAME_FIELD));
        assert_eq!(c.old_value.as_deref(), Some("a"));
        assert!(c.attr_name.is_none());
    }

    #[test]
    fn move_records_both_positions() {
        let (e, from, to) = (NodeId::new(), NodeId::new(), NodeId::new());
        let c = Change::moved(e, from, 2, to, 1);
        assert_eq!(c.source_no, Some(from.to_string()));
        assert_eq!(c.target_index, Some(1));
    }

    #[test]
    fn entry_serializes_flattened_change() {
        let entry = ChangeLogEntry {
            log_id: Ulid::new(),
            workspace: Some(WorkspaceId::new("w")),
            root: None,
            case: None,
            parent: None,
            change: Change::order(NodeId::new(), 3, 1),
            operation_by: "alice".into(),
            operation_time: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "ORDER");
        assert_eq!(json["sourceIndex"], 3);
        assert!(json.get("propName").is_none());
    }
}

//! Flat row dump of [`Tables`]
//!
//! The snapshot mirrors the relational layout one row per record, so it can
//! be written to and read from JSON or YAML fixtures.

use crate::error::StoreError;
use crate::tables::Tables;
use scriptree_model::{ChildEdge, ComponentEdge, Node, NodeId, Property};
use serde::{Deserialize, Serialize};

/// Property row: owning node plus the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRow {
    pub node: NodeId,
    #[serde(flatten)]
    pub property: Property,
}

/// All rows of a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub properties: Vec<PropertyRow>,
    #[serde(default)]
    pub child_edges: Vec<ChildEdge>,
    #[serde(default)]
    pub component_edges: Vec<ComponentEdge>,
}

impl Tables {
    /// Dump every row in a stable order
    #[must_use]
    pub fn to_snapshot(&self) -> TableSnapshot {
        let mut nodes: Vec<Node> = self.nodes().cloned().collect();
        nodes.sort_by_key(|n| n.id);

        let properties = nodes
            .iter()
            .flat_map(|n| {
                self.properties(n.id).map(|p| PropertyRow {
                    node: n.id,
                    property: p.clone(),
                })
            })
            .collect();

        let mut child_edges: Vec<ChildEdge> = self.child_edges().copied().collect();
        child_edges.sort_by_key(|e| (e.parent, e.sort));
        let mut component_edges: Vec<ComponentEdge> = self.component_edges().copied().collect();
        component_edges.sort_by_key(|e| (e.parent, e.category, e.sort));

        TableSnapshot {
            nodes,
            properties,
            child_edges,
            component_edges,
        }
    }

    /// Rebuild tables from rows
    ///
    /// # Errors
    /// Fails on duplicate node ids, rows that reference unknown nodes, or a
    /// node attached more than once.
    pub fn from_snapshot(snapshot: TableSnapshot) -> Result<Self, StoreError> {
        let mut tables = Tables::new();
        for node in snapshot.nodes {
            tables.insert_node(node)?;
        }
        for row in snapshot.properties {
            tables.require(row.node)?;
            tables.put_property(row.node, row.property);
        }
        for edge in snapshot.child_edges {
            tables.require(edge.parent)?;
            tables.require(edge.child)?;
            tables.restore_child_edge(edge)?;
        }
        for edge in snapshot.component_edges {
            tables.require(edge.parent)?;
            tables.require(edge.child)?;
            tables.restore_component_edge(edge)?;
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptree_model::{ComponentCategory, ElementType, NodeDraft};
    use serde_json::json;

    #[test]
    fn snapshot_rebuilds_equal_tables() {
        let mut t = Tables::new();
        let draft = NodeDraft::new("n", ElementType::Group, "TestGroup");
        let (root, child, comp) = (NodeId::new(), NodeId::new(), NodeId::new());
        for id in [root, child, comp] {
            t.insert_node(Node::from_draft(id, &draft)).unwrap();
        }
        t.append_child(root, child, root).unwrap();
        t.attach_component(child, comp, root, ComponentCategory::Assertion)
            .unwrap();
        t.set_property(child, "p", &json!({"x": 1})).unwrap();

        let snap = t.to_snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: TableSnapshot = serde_json::from_str(&json).unwrap();
        let rebuilt = Tables::from_snapshot(back).unwrap();

        assert_eq!(rebuilt.to_snapshot(), snap);
        assert_eq!(rebuilt.root_of(comp), root);
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let snap = TableSnapshot {
            child_edges: vec![ChildEdge {
                root: NodeId::new(),
                parent: NodeId::new(),
                child: NodeId::new(),
                sort: 1,
            }],
            ..TableSnapshot::default()
        };
        assert!(matches!(
            Tables::from_snapshot(snap),
            Err(StoreError::NodeMissing(_))
        ));
    }
}

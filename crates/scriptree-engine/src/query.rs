//! Read-only queries over a committed snapshot
//!
//! Nothing here is audited or transactional; every query reads one
//! consistent [`Tables`] snapshot.

use crate::error::{EngineError, EngineResult};
use indexmap::IndexMap;
use scriptree_model::{
    Attributes, ComponentCategory, ElementClass, ElementType, Node, NodeId, Position, WorkspaceId,
};
use scriptree_store::Tables;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// A node with decoded properties and its position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    #[serde(flatten)]
    pub node: Node,
    pub properties: IndexMap<String, Value>,
    pub position: Position,
}

/// Nested listing of a subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    pub element_type: ElementType,
    pub class: ElementClass,
    pub enabled: bool,
    pub skipped: bool,
    /// 1-based sibling position, `None` for a root
    pub sort: Option<u32>,
    pub children: Vec<TreeNode>,
}

/// One attached component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub id: NodeId,
    pub name: String,
    pub element_type: ElementType,
    pub class: ElementClass,
    pub enabled: bool,
    pub index: u32,
    pub attrs: Attributes,
    pub properties: IndexMap<String, Value>,
}

/// Components of a host grouped by category, each ordered by index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComponentListing {
    #[serde(rename = "confList")]
    pub configs: Vec<ComponentInfo>,
    #[serde(rename = "prevList")]
    pub pre_processors: Vec<ComponentInfo>,
    #[serde(rename = "postList")]
    pub post_processors: Vec<ComponentInfo>,
    #[serde(rename = "testList")]
    pub assertions: Vec<ComponentInfo>,
}

/// Read-only view over one snapshot
#[derive(Debug, Clone, Copy)]
pub struct ElementReader<'a> {
    tables: &'a Tables,
}

impl<'a> ElementReader<'a> {
    #[inline]
    #[must_use]
    pub fn new(tables: &'a Tables) -> Self {
        Self { tables }
    }

    fn require(&self, id: NodeId) -> EngineResult<&'a Node> {
        self.tables
            .node(id)
            .ok_or_else(|| EngineError::element_not_found(id))
    }

    /// Node row, decoded properties (disabled ones included) and position
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn node_info(&self, id: NodeId) -> EngineResult<NodeInfo> {
        let node = self.require(id)?.clone();
        Ok(NodeInfo {
            node,
            properties: self.tables.read_properties(id, true)?,
            position: self.tables.position(id),
        })
    }

    /// Where `id` sits in its tree
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn position(&self, id: NodeId) -> EngineResult<Position> {
        self.require(id)?;
        Ok(self.tables.position(id))
    }

    /// Subtree listing; with `depth == false` only direct children are listed
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn tree(&self, id: NodeId, depth: bool) -> EngineResult<TreeNode> {
        let node = self.require(id)?;
        let mut seen = HashSet::from([id]);
        Ok(self.listing(node, depth, true, &mut seen))
    }

    fn listing(&self, node: &Node, depth: bool, expand: bool, seen: &mut HashSet<NodeId>) -> TreeNode {
        let mut children = Vec::new();
        if expand {
            for edge in self.tables.children(node.id) {
                if !seen.insert(edge.child) {
                    continue;
                }
                if let Some(child) = self.tables.node(edge.child) {
                    children.push(self.listing(child, depth, depth, seen));
                }
            }
        }
        TreeNode {
            id: node.id,
            name: node.name.clone(),
            element_type: node.element_type,
            class: node.class.clone(),
            enabled: node.enabled,
            skipped: node.skipped,
            sort: self.tables.child_edge(node.id).map(|e| e.sort),
            children,
        }
    }

    /// Full listings of several trees; unknown roots are skipped
    #[must_use]
    pub fn trees_by_roots(&self, roots: &[NodeId]) -> Vec<TreeNode> {
        roots
            .iter()
            .filter_map(|&root| match self.tree(root, true) {
                Ok(tree) => Some(tree),
                Err(err) => {
                    warn!(root = %root, error = %err, "tree root skipped");
                    None
                }
            })
            .collect()
    }

    /// Attached components of `id`, grouped and ordered
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn components(&self, id: NodeId) -> EngineResult<ComponentListing> {
        self.require(id)?;
        let mut listing = ComponentListing::default();
        for edge in self.tables.components(id) {
            let Some(node) = self.tables.node(edge.child) else {
                continue;
            };
            let info = ComponentInfo {
                id: node.id,
                name: node.name.clone(),
                element_type: node.element_type,
                class: node.class.clone(),
                enabled: node.enabled,
                index: edge.sort,
                attrs: node.attrs.clone(),
                properties: self.tables.read_properties(node.id, true)?,
            };
            match edge.category {
                ComponentCategory::Config => listing.configs.push(info),
                ComponentCategory::PreProcessor => listing.pre_processors.push(info),
                ComponentCategory::PostProcessor => listing.post_processors.push(info),
                ComponentCategory::Assertion => listing.assertions.push(info),
            }
        }
        Ok(listing)
    }

    /// Root-level nodes bound to `workspace`, optionally of one type
    #[must_use]
    pub fn workspace_roots(
        &self,
        workspace: &WorkspaceId,
        element_type: Option<ElementType>,
    ) -> Vec<&'a Node> {
        let mut nodes: Vec<&Node> = self
            .tables
            .roots()
            .into_iter()
            .filter_map(|id| self.tables.node(id))
            .filter(|n| n.workspace.as_ref() == Some(workspace))
            .filter(|n| element_type.map_or(true, |t| n.element_type == t))
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        nodes
    }
}

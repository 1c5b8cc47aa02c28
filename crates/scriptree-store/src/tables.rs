//! In-memory relational tables and the adjacency model
//!
//! [`Tables`] is an arena of nodes keyed by identifier plus two edge
//! relations indexed both by child (the edge row) and by parent (the
//! membership set). Nodes never reference each other directly.

use crate::error::StoreError;
use indexmap::{IndexMap, IndexSet};
use scriptree_model::{
    ChildEdge, ComponentCategory, ComponentEdge, Node, NodeId, Position, Property,
};
use std::collections::{HashMap, HashSet};

/// Node, property and edge rows of every stored tree
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) properties: HashMap<NodeId, IndexMap<String, Property>>,
    child_edges: HashMap<NodeId, ChildEdge>,
    children: HashMap<NodeId, IndexSet<NodeId>>,
    component_edges: HashMap<NodeId, ComponentEdge>,
    components: HashMap<NodeId, IndexSet<NodeId>>,
}

impl Tables {
    /// Create empty tables
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No nodes stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ---- nodes ----

    /// Insert a new node row
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateNode`] if the id is taken.
    pub fn insert_node(&mut self, node: Node) -> Result<(), StoreError> {
        if self.nodes.contains_key(&node.id) {
            return Err(StoreError::DuplicateNode(node.id));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Look up a node
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a node that must exist
    ///
    /// # Errors
    /// Returns [`StoreError::NodeMissing`] if absent.
    pub fn require(&self, id: NodeId) -> Result<&Node, StoreError> {
        self.nodes.get(&id).ok_or(StoreError::NodeMissing(id))
    }

    /// Mutable access to a node that must exist
    ///
    /// # Errors
    /// Returns [`StoreError::NodeMissing`] if absent.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, StoreError> {
        self.nodes.get_mut(&id).ok_or(StoreError::NodeMissing(id))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Remove a node row and its properties; edges are left to the caller
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.properties.remove(&id);
        self.nodes.remove(&id)
    }

    /// Iterate all nodes in arbitrary order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    // ---- structural children ----

    /// Incoming structural edge of `child`
    #[inline]
    #[must_use]
    pub fn child_edge(&self, child: NodeId) -> Option<&ChildEdge> {
        self.child_edges.get(&child)
    }

    /// Structural children of `parent`, ascending by sort
    #[must_use]
    pub fn children(&self, parent: NodeId) -> Vec<ChildEdge> {
        let mut edges: Vec<ChildEdge> = self
            .children
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|c| self.child_edges.get(c).copied())
            .collect();
        edges.sort_by_key(|e| e.sort);
        edges
    }

    /// Structural child ids of `parent`, ascending by sort
    #[must_use]
    pub fn child_ids(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent).into_iter().map(|e| e.child).collect()
    }

    /// Number of structural children
    #[must_use]
    pub fn child_count(&self, parent: NodeId) -> u32 {
        self.children
            .get(&parent)
            .map_or(0, |set| u32::try_from(set.len()).unwrap_or(u32::MAX))
    }

    fn ensure_detached(&self, child: NodeId) -> Result<(), StoreError> {
        if self.child_edges.contains_key(&child) || self.component_edges.contains_key(&child) {
            return Err(StoreError::AlreadyAttached(child));
        }
        Ok(())
    }

    /// Attach `child` as the last structural child of `parent`
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyAttached`] if `child` already has a parent.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        root: NodeId,
    ) -> Result<ChildEdge, StoreError> {
        let sort = self.child_count(parent) + 1;
        self.insert_child(parent, child, root, sort)
    }

    /// Attach `child` at `sort`, shifting siblings at or after it by one
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyAttached`] if `child` already has a parent.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        root: NodeId,
        sort: u32,
    ) -> Result<ChildEdge, StoreError> {
        self.ensure_detached(child)?;
        self.shift_children(parent, sort, u32::MAX, 1);
        let edge = ChildEdge {
            root,
            parent,
            child,
            sort,
        };
        self.child_edges.insert(child, edge);
        self.children.entry(parent).or_default().insert(child);
        Ok(edge)
    }

    /// Remove the incoming structural edge of `child` and close the gap
    pub fn detach_child(&mut self, child: NodeId) -> Option<ChildEdge> {
        let edge = self.child_edges.remove(&child)?;
        if let Some(set) = self.children.get_mut(&edge.parent) {
            set.shift_remove(&child);
            if set.is_empty() {
                self.children.remove(&edge.parent);
            }
        }
        self.shift_children(edge.parent, edge.sort + 1, u32::MAX, -1);
        Some(edge)
    }

    /// Add `delta` to the sort of every child of `parent` within `from..=to`
    pub fn shift_children(&mut self, parent: NodeId, from: u32, to: u32, delta: i32) {
        let Some(set) = self.children.get(&parent) else {
            return;
        };
        for child in set {
            if let Some(edge) = self.child_edges.get_mut(child) {
                if (from..=to).contains(&edge.sort) {
                    edge.sort = edge.sort.saturating_add_signed(delta);
                }
            }
        }
    }

    /// Overwrite the sort of an attached child
    ///
    /// # Errors
    /// Returns [`StoreError::NodeMissing`] if `child` has no structural edge.
    pub fn set_child_sort(&mut self, child: NodeId, sort: u32) -> Result<(), StoreError> {
        let edge = self
            .child_edges
            .get_mut(&child)
            .ok_or(StoreError::NodeMissing(child))?;
        edge.sort = sort;
        Ok(())
    }

    // ---- components ----

    /// Incoming component edge of `child`
    #[inline]
    #[must_use]
    pub fn component_edge(&self, child: NodeId) -> Option<&ComponentEdge> {
        self.component_edges.get(&child)
    }

    /// Components of `parent`, ordered by category then sort
    #[must_use]
    pub fn components(&self, parent: NodeId) -> Vec<ComponentEdge> {
        let mut edges: Vec<ComponentEdge> = self
            .components
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|c| self.component_edges.get(c).copied())
            .collect();
        edges.sort_by_key(|e| (e.category, e.sort));
        edges
    }

    /// Components of one category, ascending by sort
    #[must_use]
    pub fn components_in(&self, parent: NodeId, category: ComponentCategory) -> Vec<ComponentEdge> {
        self.components(parent)
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Attach `child` as the last component of its category under `parent`
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyAttached`] if `child` already has a parent.
    pub fn attach_component(
        &mut self,
        parent: NodeId,
        child: NodeId,
        root: NodeId,
        category: ComponentCategory,
    ) -> Result<ComponentEdge, StoreError> {
        self.ensure_detached(child)?;
        let sort = u32::try_from(self.components_in(parent, category).len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        let edge = ComponentEdge {
            root,
            parent,
            child,
            category,
            sort,
        };
        self.component_edges.insert(child, edge);
        self.components.entry(parent).or_default().insert(child);
        Ok(edge)
    }

    /// Remove the incoming component edge of `child` and close the gap
    pub fn detach_component(&mut self, child: NodeId) -> Option<ComponentEdge> {
        let edge = self.component_edges.remove(&child)?;
        if let Some(set) = self.components.get_mut(&edge.parent) {
            set.shift_remove(&child);
            for sibling in set.iter() {
                if let Some(other) = self.component_edges.get_mut(sibling) {
                    if other.category == edge.category && other.sort > edge.sort {
                        other.sort -= 1;
                    }
                }
            }
            if set.is_empty() {
                self.components.remove(&edge.parent);
            }
        }
        Some(edge)
    }

    /// Overwrite the sort of an attached component
    ///
    /// # Errors
    /// Returns [`StoreError::NodeMissing`] if `child` has no component edge.
    pub fn set_component_sort(&mut self, child: NodeId, sort: u32) -> Result<(), StoreError> {
        let edge = self
            .component_edges
            .get_mut(&child)
            .ok_or(StoreError::NodeMissing(child))?;
        edge.sort = sort;
        Ok(())
    }

    // ---- ancestry ----

    /// Where `id` sits in its tree
    #[must_use]
    pub fn position(&self, id: NodeId) -> Position {
        if let Some(edge) = self.child_edges.get(&id) {
            Position::Child(*edge)
        } else if let Some(edge) = self.component_edges.get(&id) {
            Position::Component(*edge)
        } else {
            Position::Root
        }
    }

    /// Parent through either relation
    #[inline]
    #[must_use]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.position(id).parent()
    }

    /// Cached root of `id`'s tree; a node without an edge is its own root
    #[inline]
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.position(id).root().unwrap_or(id)
    }

    /// Whether `ancestor` is `node` or lies on its parent chain
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            cursor = self.parent_of(id);
        }
        false
    }

    /// Every node below `id` through both relations, pre-order
    ///
    /// A node's components are listed before its structural children.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        self.collect_descendants(id, &mut out, &mut seen);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>, seen: &mut HashSet<NodeId>) {
        let below = self
            .components(id)
            .into_iter()
            .map(|e| e.child)
            .chain(self.child_ids(id));
        for child in below {
            if seen.insert(child) {
                out.push(child);
                self.collect_descendants(child, out, seen);
            }
        }
    }

    /// Rewrite the cached root on every edge below `id`
    pub fn rewrite_root(&mut self, id: NodeId, root: NodeId) {
        for node in self.descendants(id) {
            if let Some(edge) = self.child_edges.get_mut(&node) {
                edge.root = root;
            }
            if let Some(edge) = self.component_edges.get_mut(&node) {
                edge.root = root;
            }
        }
    }

    /// Nodes without an incoming edge
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| {
                !self.child_edges.contains_key(id) && !self.component_edges.contains_key(id)
            })
            .copied()
            .collect();
        roots.sort();
        roots
    }

    /// Check that the children of `parent` are numbered exactly `1..=N`
    ///
    /// # Errors
    /// Returns [`StoreError::SparseSiblings`] with the observed sorts.
    pub fn check_child_density(&self, parent: NodeId) -> Result<(), StoreError> {
        let sorts: Vec<u32> = self.children(parent).iter().map(|e| e.sort).collect();
        dense_or_err(parent, sorts)
    }

    /// Check that every component category of `parent` is numbered `1..=N`
    ///
    /// # Errors
    /// Returns [`StoreError::SparseSiblings`] for the first sparse category.
    pub fn check_component_density(&self, parent: NodeId) -> Result<(), StoreError> {
        for category in ComponentCategory::ALL {
            let sorts: Vec<u32> = self
                .components_in(parent, category)
                .iter()
                .map(|e| e.sort)
                .collect();
            dense_or_err(parent, sorts)?;
        }
        Ok(())
    }

    pub(crate) fn child_edges(&self) -> impl Iterator<Item = &ChildEdge> {
        self.child_edges.values()
    }

    pub(crate) fn component_edges(&self) -> impl Iterator<Item = &ComponentEdge> {
        self.component_edges.values()
    }

    pub(crate) fn parents(&self) -> impl Iterator<Item = &NodeId> {
        self.children.keys()
    }

    pub(crate) fn hosts(&self) -> impl Iterator<Item = &NodeId> {
        self.components.keys()
    }

    pub(crate) fn restore_child_edge(&mut self, edge: ChildEdge) -> Result<(), StoreError> {
        self.ensure_detached(edge.child)?;
        self.child_edges.insert(edge.child, edge);
        self.children.entry(edge.parent).or_default().insert(edge.child);
        Ok(())
    }

    pub(crate) fn restore_component_edge(&mut self, edge: ComponentEdge) -> Result<(), StoreError> {
        self.ensure_detached(edge.child)?;
        self.component_edges.insert(edge.child, edge);
        self.components.entry(edge.parent).or_default().insert(edge.child);
        Ok(())
    }
}

/// Whether `sorts` (ascending) is exactly `1..=N`
#[must_use]
pub fn is_dense(sorts: &[u32]) -> bool {
    sorts
        .iter()
        .enumerate()
        .all(|(i, s)| usize::try_from(*s).is_ok_and(|s| s == i + 1))
}

fn dense_or_err(parent: NodeId, sorts: Vec<u32>) -> Result<(), StoreError> {
    if is_dense(&sorts) {
        Ok(())
    } else {
        Err(StoreError::SparseSiblings { parent, sorts })
    }
}

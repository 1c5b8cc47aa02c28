//! Mutation primitives shared by every engine operation
//!
//! A [`Tx`] pairs the staged tables of one unit of work with the change
//! recorder of the same operation. Everything here runs inside
//! `ElementStore::unit_of_work`; an error anywhere discards all of it.

use crate::components::{ComponentSpec, Components};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use scriptree_audit::ChangeRecorder;
use scriptree_model::{
    Change, ComponentCategory, IdGenerator, Node, NodeDraft, NodeId, WorkspaceId,
    NAME_FIELD,
};
use scriptree_store::{PropertyChange, Tables};
use std::collections::HashSet;
use tracing::error;

pub(crate) struct Tx<'a> {
    pub(crate) tables: &'a mut Tables,
    pub(crate) recorder: &'a mut ChangeRecorder,
    pub(crate) ids: &'a dyn IdGenerator,
    pub(crate) config: &'a EngineConfig,
}

impl Tx<'_> {
    pub(crate) fn record(&mut self, change: Change) {
        self.recorder.record(self.tables, change);
    }

    pub(crate) fn node(&self, id: NodeId) -> EngineResult<&Node> {
        self.tables
            .node(id)
            .ok_or_else(|| EngineError::element_not_found(id))
    }

    /// Insert a node row with its properties; no edge, no audit
    pub(crate) fn insert_draft(
        &mut self,
        draft: &NodeDraft,
        workspace: Option<WorkspaceId>,
    ) -> EngineResult<NodeId> {
        let id = self.ids.next_id();
        let mut node = Node::from_draft(id, draft);
        node.workspace = workspace;
        self.tables.insert_node(node)?;
        for (name, value) in &draft.props {
            self.tables.set_property(id, name, value)?;
        }
        Ok(id)
    }

    /// Create and attach every requested component of a new host
    pub(crate) fn create_components(
        &mut self,
        host: NodeId,
        root: NodeId,
        components: &Components,
    ) -> EngineResult<Vec<NodeId>> {
        let mut created = Vec::new();
        for (category, specs) in components.ordered() {
            for spec in specs {
                created.push(self.create_component(host, root, category, spec)?);
            }
        }
        Ok(created)
    }

    fn create_component(
        &mut self,
        host: NodeId,
        root: NodeId,
        category: ComponentCategory,
        spec: &ComponentSpec,
    ) -> EngineResult<NodeId> {
        if ComponentCategory::from_element_type(spec.draft.element_type) != Some(category) {
            return Err(EngineError::Validation(format!(
                "{} component {} listed as {category}",
                spec.draft.element_type, spec.draft.name
            )));
        }
        let id = self.insert_draft(&spec.draft, None)?;
        self.tables.attach_component(host, id, root, category)?;
        self.record(Change::insert(id));
        Ok(id)
    }

    /// Bring the components of `host` in line with `components`
    ///
    /// Known ids are updated in place, unknown or missing ids are created,
    /// and every existing component absent from the request is deleted.
    /// Each category is then renumbered in requested order.
    pub(crate) fn reconcile_components(
        &mut self,
        host: NodeId,
        components: &Components,
    ) -> EngineResult<()> {
        let root = self.tables.root_of(host);
        let mut keep: HashSet<NodeId> = HashSet::new();
        let mut order: Vec<(ComponentCategory, Vec<NodeId>)> = Vec::new();

        for (category, specs) in components.ordered() {
            let mut ids = Vec::with_capacity(specs.len());
            for spec in specs {
                let existing = spec
                    .id
                    .and_then(|id| self.tables.component_edge(id).copied())
                    .filter(|edge| edge.parent == host);
                let id = match existing {
                    Some(edge) if edge.category == category => {
                        self.update_component(edge.child, spec)?;
                        edge.child
                    }
                    Some(edge) => {
                        return Err(EngineError::Validation(format!(
                            "component {} is a {} and cannot be listed as {category}",
                            edge.child, edge.category
                        )))
                    }
                    None => self.create_component(host, root, category, spec)?,
                };
                keep.insert(id);
                ids.push(id);
            }
            order.push((category, ids));
        }

        let stale: Vec<NodeId> = self
            .tables
            .components(host)
            .into_iter()
            .map(|e| e.child)
            .filter(|id| !keep.contains(id))
            .collect();
        for id in stale {
            self.record(Change::delete(id));
            self.purge(id);
        }

        for (_, ids) in order {
            for (i, id) in ids.into_iter().enumerate() {
                self.tables.set_component_sort(id, sort_of(i))?;
            }
        }
        self.tables.check_component_density(host)?;
        Ok(())
    }

    fn update_component(&mut self, id: NodeId, spec: &ComponentSpec) -> EngineResult<()> {
        let old_name = self.node(id)?.name.clone();
        if old_name != spec.draft.name {
            self.record(Change::update(
                id,
                NAME_FIELD,
                Some(old_name),
                Some(spec.draft.name.clone()),
            ));
        }
        self.reconcile_properties(id, &spec.draft.props)?;
        let node = self.tables.node_mut(id)?;
        node.name.clone_from(&spec.draft.name);
        node.enabled = spec.draft.enabled;
        Ok(())
    }

    /// Replace the property set of `id`, auditing each transition
    pub(crate) fn reconcile_properties(
        &mut self,
        id: NodeId,
        desired: &scriptree_model::PropertyMap,
    ) -> EngineResult<()> {
        let changes = self.tables.reconcile_properties(id, desired)?;
        for change in changes {
            let name = change.name().to_string();
            let entry = match change {
                PropertyChange::Inserted(new) => Change::update(id, name, None, new.audit_text()),
                PropertyChange::Updated { old, new } => {
                    Change::update(id, name, old.audit_text(), new.audit_text())
                }
                PropertyChange::Removed(old) if self.config.audit_property_removals => {
                    Change::update(id, name, old.audit_text(), None)
                }
                PropertyChange::Removed(_) => continue,
            };
            self.record(entry);
        }
        Ok(())
    }

    /// Remove `id`, its whole subtree and every edge touching them
    ///
    /// The gap left in the former parent's sequence is closed.
    pub(crate) fn purge(&mut self, id: NodeId) {
        for node in self.tables.descendants(id).into_iter().rev() {
            self.tables.detach_child(node);
            self.tables.detach_component(node);
            self.tables.remove_node(node);
        }
        self.tables.detach_child(id);
        self.tables.detach_component(id);
        self.tables.remove_node(id);
    }

    /// Deep-clone `source` with fresh ids, returning the detached clone
    ///
    /// With `standalone` the clone is the root of a new tree and keeps (or
    /// takes) a workspace binding; otherwise it and its descendants live
    /// under `root`, the tree it is about to be attached to.
    pub(crate) fn clone_subtree(
        &mut self,
        source: NodeId,
        root: NodeId,
        standalone: bool,
        rename: bool,
        workspace: Option<WorkspaceId>,
    ) -> EngineResult<NodeId> {
        let original = self.node(source)?.clone();
        let id = self.ids.next_id();
        let root = if standalone { id } else { root };

        let mut copy = original;
        copy.id = id;
        copy.workspace = if standalone {
            workspace.or(copy.workspace)
        } else {
            None
        };
        if rename {
            copy.name.push_str(&self.config.copy_suffix);
        }
        self.tables.insert_node(copy)?;
        self.tables.copy_properties(source, id);

        for edge in self.tables.children(source) {
            let child = self.clone_subtree(edge.child, root, false, false, None)?;
            self.tables.append_child(id, child, root)?;
        }
        for edge in self.tables.components(source) {
            let component = self.clone_subtree(edge.child, root, false, false, None)?;
            self.tables
                .attach_component(id, component, root, edge.category)?;
        }
        Ok(id)
    }

    /// Fail with a consistency error if the children of `parent` have gaps
    pub(crate) fn verify_children(&self, parent: NodeId) -> EngineResult<()> {
        if !self.config.verify_sibling_order {
            return Ok(());
        }
        self.tables.check_child_density(parent).map_err(|err| {
            error!(parent = %parent, error = %err, "sibling order broken");
            EngineError::from(err)
        })
    }
}

/// 1-based sort for a 0-based position
#[inline]
pub(crate) fn sort_of(position: usize) -> u32 {
    u32::try_from(position).map_or(u32::MAX, |p| p.saturating_add(1))
}

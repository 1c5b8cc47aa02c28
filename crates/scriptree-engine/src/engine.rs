//! Mutation engine
//!
//! Every public operation runs as one unit of work: all row changes and
//! sort shifts commit together or not at all. Change-log entries are built
//! while the operation runs and delivered to the audit sink after commit.

use crate::components::Components;
use crate::config::EngineConfig;
use crate::context::OperationContext;
use crate::error::{EngineError, EngineResult};
use crate::rules::{check_placement, PasteMode};
use crate::tx::{sort_of, Tx};
use scriptree_audit::{publish, AuditSink, ChangeRecorder, TracingAuditSink};
use scriptree_model::{
    Attributes, Change, IdGenerator, NodeDraft, NodeId, Position, PropertyMap, UlidGenerator,
    WorkspaceId, DESC_FIELD, ENABLED_FIELD, NAME_FIELD, SKIPPED_FIELD,
};
use scriptree_store::{ElementStore, Tables};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Fields of a modify request
///
/// Name and description are always written. `None` for attributes,
/// properties or components leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attrs: Option<Attributes>,
    #[serde(default)]
    pub props: Option<PropertyMap>,
    #[serde(default)]
    pub components: Option<Components>,
}

impl ModifyRequest {
    /// Rename-only request
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = Some(attrs);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_props(mut self, props: PropertyMap) -> Self {
        self.props = Some(props);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_components(mut self, components: Components) -> Self {
        self.components = Some(components);
        self
    }
}

/// Structural editor over an [`ElementStore`]
pub struct MutationEngine {
    store: Arc<ElementStore>,
    ids: Arc<dyn IdGenerator>,
    sink: Arc<dyn AuditSink>,
    config: EngineConfig,
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MutationEngine {
    /// Engine with ULID ids and a tracing audit sink
    #[must_use]
    pub fn new(store: Arc<ElementStore>) -> Self {
        Self {
            store,
            ids: Arc::new(UlidGenerator),
            sink: Arc::new(TracingAuditSink),
            config: EngineConfig::default(),
        }
    }

    /// With identifier generator
    #[inline]
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// With audit sink
    #[inline]
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ElementStore> {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Committed state for read-only use
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<Tables> {
        self.store.snapshot()
    }

    fn run<T>(
        &self,
        ctx: &OperationContext,
        work: impl FnOnce(&mut Tx<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let actor = ctx.actor_or(&self.config.default_actor);
        let mut recorder = ChangeRecorder::new(actor, ctx.workspace.clone())
            .with_id_generator(Arc::clone(&self.ids));
        let out = self.store.unit_of_work(|tables| {
            let mut tx = Tx {
                tables,
                recorder: &mut recorder,
                ids: self.ids.as_ref(),
                config: &self.config,
            };
            work(&mut tx)
        })?;
        publish(self.sink.as_ref(), &recorder.finish());
        Ok(out)
    }

    /// Create a node, optionally as the last child of `parent`
    ///
    /// Without a parent the node starts a new tree; collections, snippets and
    /// configs are then bound to the caller's workspace.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if `parent` does not exist
    /// - [`EngineError::Validation`] if a component is listed under the wrong category
    pub fn create(
        &self,
        ctx: &OperationContext,
        parent: Option<NodeId>,
        draft: &NodeDraft,
        components: Option<&Components>,
    ) -> EngineResult<NodeId> {
        let id = self.run(ctx, |tx| {
            let (id, root) = match parent {
                Some(parent) => {
                    tx.node(parent)?;
                    let root = tx.tables.root_of(parent);
                    let id = tx.insert_draft(draft, None)?;
                    tx.tables.append_child(parent, id, root)?;
                    (id, root)
                }
                None => {
                    let workspace = binds_workspace(draft)
                        .then(|| ctx.workspace.clone())
                        .flatten();
                    let id = tx.insert_draft(draft, workspace)?;
                    (id, id)
                }
            };
            tx.record(Change::insert(id));
            if let Some(components) = components {
                tx.create_components(id, root, components)?;
            }
            Ok(id)
        })?;
        info!(element = %id, parent = ?parent.map(|p| p.to_string()), "element created");
        Ok(id)
    }

    /// Update name, description, attributes, properties and components
    ///
    /// One UPDATE entry is recorded per changed field, attribute key and
    /// property.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn modify(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        request: &ModifyRequest,
    ) -> EngineResult<()> {
        self.run(ctx, |tx| {
            let node = tx.node(id)?.clone();
            if node.name != request.name {
                tx.record(Change::update(
                    id,
                    NAME_FIELD,
                    Some(node.name.clone()),
                    Some(request.name.clone()),
                ));
            }
            if node.description != request.description {
                tx.record(Change::update(
                    id,
                    DESC_FIELD,
                    node.description.clone(),
                    request.description.clone(),
                ));
            }
            if let Some(attrs) = &request.attrs {
                for (key, change) in diff_attrs(&node.attrs, attrs) {
                    tx.record(Change::attr_update(id, key, change.0, change.1));
                }
            }
            if let Some(props) = &request.props {
                tx.reconcile_properties(id, props)?;
            }

            let stored = tx.tables.node_mut(id)?;
            stored.name.clone_from(&request.name);
            stored.description.clone_from(&request.description);
            if let Some(attrs) = &request.attrs {
                stored.attrs.clone_from(attrs);
            }

            if let Some(components) = &request.components {
                tx.reconcile_components(id, components)?;
            }
            Ok(())
        })?;
        info!(element = %id, "element modified");
        Ok(())
    }

    /// Delete a node with its entire subtree, closing the gap it leaves
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn delete(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.run(ctx, |tx| {
            tx.node(id)?;
            let parent = tx.tables.child_edge(id).map(|e| e.parent);
            tx.record(Change::delete(id));
            tx.purge(id);
            if let Some(parent) = parent {
                tx.verify_children(parent)?;
            }
            Ok(())
        })?;
        info!(element = %id, "element deleted");
        Ok(())
    }

    /// Move `source` to 0-based position `target_index` under `target_parent`
    ///
    /// Within the same parent this is a reorder (ORDER entry); otherwise the
    /// node and its subtree are reparented (MOVE entry) after the placement
    /// rules are checked. Moving a node onto its current position is a no-op.
    ///
    /// # Errors
    /// - [`EngineError::Validation`] for a negative or out-of-range index, or a
    ///   move into the node's own subtree
    /// - [`EngineError::NotFound`] if either node is missing or `source` has no parent
    /// - [`EngineError::Compatibility`] if the placement rules reject the new parent
    /// - [`EngineError::Consistency`] if the target's children end up sparse
    pub fn move_node(
        &self,
        ctx: &OperationContext,
        source: NodeId,
        target_parent: NodeId,
        target_index: i64,
    ) -> EngineResult<()> {
        let position = usize::try_from(target_index).map_err(|_| {
            EngineError::Validation(format!("target index must not be negative: {target_index}"))
        })?;
        let target_sort = sort_of(position);

        self.run(ctx, |tx| {
            tx.node(source)?;
            tx.node(target_parent)?;
            let edge = *tx.tables.child_edge(source).ok_or(EngineError::NotFound {
                what: "source parent",
                id: source,
            })?;

            if edge.parent == target_parent {
                let count = tx.tables.child_count(target_parent);
                if target_sort > count {
                    return Err(out_of_range(target_index, count));
                }
                if target_sort == edge.sort {
                    return Ok(());
                }
                if target_sort < edge.sort {
                    tx.tables
                        .shift_children(target_parent, target_sort, edge.sort - 1, 1);
                } else {
                    tx.tables
                        .shift_children(target_parent, edge.sort + 1, target_sort, -1);
                }
                tx.tables.set_child_sort(source, target_sort)?;
                tx.record(Change::order(source, edge.sort, target_sort));
            } else {
                if tx.tables.is_ancestor_or_self(source, target_parent) {
                    return Err(EngineError::Validation(format!(
                        "cannot move {source} into its own subtree"
                    )));
                }
                check_placement(tx.node(source)?, tx.node(target_parent)?)?;
                let count = tx.tables.child_count(target_parent);
                if target_sort > count + 1 {
                    return Err(out_of_range(target_index, count + 1));
                }
                let root = tx.tables.root_of(target_parent);
                tx.tables.detach_child(source);
                tx.tables.insert_child(target_parent, source, root, target_sort)?;
                tx.tables.rewrite_root(source, root);
                tx.recorder.invalidate();
                tx.record(Change::moved(
                    source,
                    edge.parent,
                    edge.sort,
                    target_parent,
                    target_sort,
                ));
                tx.verify_children(edge.parent)?;
            }
            tx.verify_children(target_parent)
        })?;
        info!(element = %source, parent = %target_parent, index = target_index, "element moved");
        Ok(())
    }

    /// Deep-clone `source` and place the clone right after it
    ///
    /// The clone's top node is renamed with the configured suffix. A
    /// root-level config is cloned standalone.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if `source` does not exist
    /// - [`EngineError::Validation`] for collections, snippets, components, or
    ///   a non-config node without a parent
    pub fn duplicate(&self, ctx: &OperationContext, source: NodeId) -> EngineResult<NodeId> {
        let id = self.run(ctx, |tx| {
            let node = tx.node(source)?.clone();
            if node.element_type == scriptree_model::ElementType::Collection {
                return Err(EngineError::Validation(
                    "collections cannot be duplicated".to_string(),
                ));
            }
            let clone = match tx.tables.position(source) {
                Position::Root if node.is_config() => {
                    tx.clone_subtree(source, source, true, true, None)?
                }
                Position::Root => {
                    return Err(EngineError::Validation(format!(
                        "{source} has no parent to duplicate into"
                    )))
                }
                Position::Component(_) => {
                    return Err(EngineError::Validation(
                        "components are duplicated through their host".to_string(),
                    ))
                }
                Position::Child(edge) => {
                    let clone = tx.clone_subtree(source, edge.root, false, true, None)?;
                    tx.tables
                        .insert_child(edge.parent, clone, edge.root, edge.sort + 1)?;
                    tx.verify_children(edge.parent)?;
                    clone
                }
            };
            tx.record(Change::copy(clone, source));
            Ok(clone)
        })?;
        info!(element = %id, source = %source, "element duplicated");
        Ok(id)
    }

    /// Paste `source` as the last child of `target`
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if either node is missing
    /// - [`EngineError::Compatibility`] if the placement rules reject the pairing
    /// - [`EngineError::Validation`] when cutting a node without a parent or
    ///   into its own subtree
    pub fn paste(
        &self,
        ctx: &OperationContext,
        source: NodeId,
        target: NodeId,
        mode: PasteMode,
    ) -> EngineResult<Option<NodeId>> {
        let pasted = self.run(ctx, |tx| {
            check_placement(tx.node(source)?, tx.node(target)?)?;
            let root = tx.tables.root_of(target);
            match mode {
                PasteMode::Copy => {
                    let clone = tx.clone_subtree(source, root, false, false, None)?;
                    tx.tables.append_child(target, clone, root)?;
                    tx.record(Change::copy(clone, source));
                    Ok(Some(clone))
                }
                PasteMode::Cut => {
                    let edge = *tx.tables.child_edge(source).ok_or_else(|| {
                        EngineError::Validation(format!("{source} has no parent to cut from"))
                    })?;
                    if tx.tables.is_ancestor_or_self(source, target) {
                        return Err(EngineError::Validation(format!(
                            "cannot paste {source} into its own subtree"
                        )));
                    }
                    tx.tables.detach_child(source);
                    let moved = tx.tables.append_child(target, source, root)?;
                    tx.tables.rewrite_root(source, root);
                    tx.recorder.invalidate();
                    tx.record(Change::moved(
                        source,
                        edge.parent,
                        edge.sort,
                        target,
                        moved.sort,
                    ));
                    tx.verify_children(edge.parent)?;
                    tx.verify_children(target)?;
                    Ok(None)
                }
            }
        })?;
        info!(element = %source, target = %target, mode = ?mode, "element pasted");
        Ok(pasted)
    }

    /// Enable a node and clear its skipped marker
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn enable(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.set_state(ctx, id, |_| (true, false))
    }

    /// Disable a node; descendants are untouched
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn disable(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.set_state(ctx, id, |(_, skipped)| (false, skipped))
    }

    /// Flip the enabled flag
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn toggle(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.set_state(ctx, id, |(enabled, skipped)| (!enabled, skipped))
    }

    /// Mark a node as skipped
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if `id` does not exist.
    pub fn skip(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.set_state(ctx, id, |(enabled, _)| (enabled, true))
    }

    fn set_state(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        next: impl FnOnce((bool, bool)) -> (bool, bool),
    ) -> EngineResult<()> {
        self.run(ctx, |tx| {
            let node = tx.node(id)?;
            let before = (node.enabled, node.skipped);
            let after = next(before);
            if before.0 != after.0 {
                tx.record(Change::update(
                    id,
                    ENABLED_FIELD,
                    Some(before.0.to_string()),
                    Some(after.0.to_string()),
                ));
            }
            if before.1 != after.1 {
                tx.record(Change::update(
                    id,
                    SKIPPED_FIELD,
                    Some(before.1.to_string()),
                    Some(after.1.to_string()),
                ));
            }
            let node = tx.tables.node_mut(id)?;
            node.enabled = after.0;
            node.skipped = after.1;
            Ok(())
        })
    }

    /// Clone a root-level collection, snippet or config into `workspace`
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if `id` does not exist
    /// - [`EngineError::Validation`] if `id` is not a root-level collection, snippet or config
    pub fn copy_to_workspace(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        workspace: &WorkspaceId,
    ) -> EngineResult<NodeId> {
        let clone = self.run(ctx, |tx| {
            require_workspace_root(tx, id)?;
            let clone = tx.clone_subtree(id, id, true, false, Some(workspace.clone()))?;
            tx.record(Change::copy(clone, id));
            Ok(clone)
        })?;
        info!(element = %id, clone = %clone, workspace = %workspace, "element copied to workspace");
        Ok(clone)
    }

    /// Re-home a root-level collection, snippet or config to `workspace`
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if `id` does not exist
    /// - [`EngineError::Validation`] if `id` is not root-level or has no workspace
    pub fn move_to_workspace(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        workspace: &WorkspaceId,
    ) -> EngineResult<()> {
        self.run(ctx, |tx| {
            require_workspace_root(tx, id)?;
            let current = tx.node(id)?.workspace.clone().ok_or_else(|| {
                EngineError::Validation(format!("{id} is not bound to a workspace"))
            })?;
            tx.record(Change::transfer(id, &current, workspace));
            tx.tables.node_mut(id)?.workspace = Some(workspace.clone());
            Ok(())
        })?;
        info!(element = %id, workspace = %workspace, "element moved to workspace");
        Ok(())
    }
}

fn binds_workspace(draft: &NodeDraft) -> bool {
    matches!(
        draft.element_type,
        scriptree_model::ElementType::Collection | scriptree_model::ElementType::Config
    )
}

fn require_workspace_root(tx: &Tx<'_>, id: NodeId) -> EngineResult<()> {
    let node = tx.node(id)?;
    if !node.is_workspace_bound() || tx.tables.position(id) != Position::Root {
        return Err(EngineError::Validation(format!(
            "{id} is not a root-level collection, snippet or config"
        )));
    }
    Ok(())
}

fn out_of_range(index: i64, len: u32) -> EngineError {
    EngineError::Validation(format!("target index {index} out of range 0..{len}"))
}

type AttrChange = (Option<String>, Option<String>);

/// Per-key attribute changes, values rendered as audit text
fn diff_attrs(old: &Attributes, new: &Attributes) -> Vec<(String, AttrChange)> {
    let text = |v: Option<&Value>| match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    let mut changes: Vec<(String, AttrChange)> = new
        .iter()
        .filter(|(key, value)| old.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), (text(old.get(key.as_str())), text(Some(value)))))
        .collect();
    changes.extend(
        old.iter()
            .filter(|(key, _)| !new.contains_key(key.as_str()))
            .map(|(key, value)| (key.clone(), (text(Some(value)), None))),
    );
    changes
}

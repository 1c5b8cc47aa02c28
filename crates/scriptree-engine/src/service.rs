//! Permission-checked facade over the engine, queries and compiler
//!
//! Every call resolves the workspace its [`Authorization`] refers to, asks
//! the injected [`PermissionCheck`], and only then runs the operation.

use crate::auth::{permission, Authorization, PermissionCheck, Scope};
use crate::components::Components;
use crate::context::OperationContext;
use crate::engine::{ModifyRequest, MutationEngine};
use crate::error::{EngineError, EngineResult};
use crate::query::{ComponentListing, ElementReader, NodeInfo, TreeNode};
use crate::rules::PasteMode;
use indexmap::IndexMap;
use scriptree_compiler::{
    inject_variables, CompileOptions, ElementDocument, TreeCompiler, VariableRegistry,
};
use scriptree_model::{ElementType, Node, NodeDraft, NodeId, Position, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Scope plus variable selection for one compile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileRequest {
    pub options: CompileOptions,
    /// Dataset ids to resolve; none means no variable node
    pub datasets: Vec<String>,
    /// Prefer each variable's current value over its initial one
    pub use_current: bool,
    /// Extra variables; `${name}` values read a resolved variable
    pub additional: IndexMap<String, String>,
}

impl CompileRequest {
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_datasets(mut self, datasets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.datasets = datasets.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn use_current(mut self) -> Self {
        self.use_current = true;
        self
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional.insert(name.into(), value.into());
        self
    }
}

/// External entry point
pub struct ElementService {
    engine: MutationEngine,
    permissions: Arc<dyn PermissionCheck>,
    variables: Arc<VariableRegistry>,
}

impl std::fmt::Debug for ElementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementService")
            .field("engine", &self.engine)
            .field("datasets", &self.variables.len())
            .finish_non_exhaustive()
    }
}

impl ElementService {
    #[must_use]
    pub fn new(engine: MutationEngine, permissions: Arc<dyn PermissionCheck>) -> Self {
        Self {
            engine,
            permissions,
            variables: Arc::new(VariableRegistry::new()),
        }
    }

    /// With a shared variable dataset registry
    #[inline]
    #[must_use]
    pub fn with_variables(mut self, variables: Arc<VariableRegistry>) -> Self {
        self.variables = variables;
        self
    }

    #[inline]
    #[must_use]
    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    #[inline]
    #[must_use]
    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    /// Workspace owning the tree `id` belongs to
    fn workspace_of(&self, id: NodeId) -> Option<WorkspaceId> {
        let tables = self.engine.snapshot();
        let root = tables.root_of(id);
        tables.node(root).and_then(|n| n.workspace.clone())
    }

    fn authorize(&self, ctx: &OperationContext, auth: Authorization) -> EngineResult<()> {
        let workspace = match auth.scope {
            Scope::Caller => ctx.workspace.clone(),
            Scope::Workspace(workspace) => Some(workspace),
            Scope::NodeWorkspace(id) => self.workspace_of(id),
        };
        let actor = ctx.actor_or(&self.engine.config().default_actor);
        if self
            .permissions
            .allows(actor, auth.permission, workspace.as_ref())
        {
            return Ok(());
        }
        warn!(actor, permission = auth.permission, workspace = ?workspace, "permission denied");
        Err(EngineError::Denied {
            permission: auth.permission,
            actor: actor.to_string(),
            workspace,
        })
    }

    fn on_node(&self, ctx: &OperationContext, code: &'static str, id: NodeId) -> EngineResult<()> {
        self.authorize(ctx, Authorization::new(code, Scope::NodeWorkspace(id)))
    }

    /// See [`MutationEngine::create`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn create(
        &self,
        ctx: &OperationContext,
        parent: Option<NodeId>,
        draft: &NodeDraft,
        components: Option<&Components>,
    ) -> EngineResult<NodeId> {
        let scope = parent.map_or(Scope::Caller, Scope::NodeWorkspace);
        self.authorize(ctx, Authorization::new(permission::CREATE, scope))?;
        self.engine.create(ctx, parent, draft, components)
    }

    /// See [`MutationEngine::modify`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn modify(&self, ctx: &OperationContext, id: NodeId, request: &ModifyRequest) -> EngineResult<()> {
        self.on_node(ctx, permission::MODIFY, id)?;
        self.engine.modify(ctx, id, request)
    }

    /// See [`MutationEngine::delete`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn delete(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.on_node(ctx, permission::REMOVE, id)?;
        self.engine.delete(ctx, id)
    }

    /// See [`MutationEngine::move_node`]; checked in both trees
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn move_node(
        &self,
        ctx: &OperationContext,
        source: NodeId,
        target_parent: NodeId,
        target_index: i64,
    ) -> EngineResult<()> {
        self.on_node(ctx, permission::MOVE, source)?;
        self.on_node(ctx, permission::MOVE, target_parent)?;
        self.engine.move_node(ctx, source, target_parent, target_index)
    }

    /// See [`MutationEngine::duplicate`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn duplicate(&self, ctx: &OperationContext, source: NodeId) -> EngineResult<NodeId> {
        self.on_node(ctx, permission::DUPLICATE, source)?;
        self.engine.duplicate(ctx, source)
    }

    /// See [`MutationEngine::paste`]; checked in both trees
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn paste(
        &self,
        ctx: &OperationContext,
        source: NodeId,
        target: NodeId,
        mode: PasteMode,
    ) -> EngineResult<Option<NodeId>> {
        self.on_node(ctx, permission::PASTE, source)?;
        self.on_node(ctx, permission::PASTE, target)?;
        self.engine.paste(ctx, source, target, mode)
    }

    /// See [`MutationEngine::enable`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn enable(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.on_node(ctx, permission::STATE, id)?;
        self.engine.enable(ctx, id)
    }

    /// See [`MutationEngine::disable`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn disable(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.on_node(ctx, permission::STATE, id)?;
        self.engine.disable(ctx, id)
    }

    /// See [`MutationEngine::toggle`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn toggle(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.on_node(ctx, permission::STATE, id)?;
        self.engine.toggle(ctx, id)
    }

    /// See [`MutationEngine::skip`]
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn skip(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<()> {
        self.on_node(ctx, permission::STATE, id)?;
        self.engine.skip(ctx, id)
    }

    /// See [`MutationEngine::copy_to_workspace`]; checked in source and target
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn copy_to_workspace(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        workspace: &WorkspaceId,
    ) -> EngineResult<NodeId> {
        self.on_node(ctx, permission::COPY_TO_WORKSPACE, id)?;
        self.authorize(
            ctx,
            Authorization::new(permission::COPY_TO_WORKSPACE, Scope::Workspace(workspace.clone())),
        )?;
        self.engine.copy_to_workspace(ctx, id, workspace)
    }

    /// See [`MutationEngine::move_to_workspace`]; checked in source and target
    ///
    /// # Errors
    /// [`EngineError::Denied`], or any error of the engine operation.
    pub fn move_to_workspace(
        &self,
        ctx: &OperationContext,
        id: NodeId,
        workspace: &WorkspaceId,
    ) -> EngineResult<()> {
        self.on_node(ctx, permission::MOVE_TO_WORKSPACE, id)?;
        self.authorize(
            ctx,
            Authorization::new(permission::MOVE_TO_WORKSPACE, Scope::Workspace(workspace.clone())),
        )?;
        self.engine.move_to_workspace(ctx, id, workspace)
    }

    /// # Errors
    /// [`EngineError::Denied`] or [`EngineError::NotFound`].
    pub fn node_info(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<NodeInfo> {
        self.on_node(ctx, permission::QUERY, id)?;
        ElementReader::new(&self.engine.snapshot()).node_info(id)
    }

    /// # Errors
    /// [`EngineError::Denied`] or [`EngineError::NotFound`].
    pub fn position(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<Position> {
        self.on_node(ctx, permission::QUERY, id)?;
        ElementReader::new(&self.engine.snapshot()).position(id)
    }

    /// # Errors
    /// [`EngineError::Denied`] or [`EngineError::NotFound`].
    pub fn tree(&self, ctx: &OperationContext, id: NodeId, depth: bool) -> EngineResult<TreeNode> {
        self.on_node(ctx, permission::QUERY, id)?;
        ElementReader::new(&self.engine.snapshot()).tree(id, depth)
    }

    /// Listings of several trees; roots the caller may not read are skipped
    /// like missing ones
    #[must_use]
    pub fn trees_by_roots(&self, ctx: &OperationContext, roots: &[NodeId]) -> Vec<TreeNode> {
        let readable: Vec<NodeId> = roots
            .iter()
            .copied()
            .filter(|&root| self.on_node(ctx, permission::QUERY, root).is_ok())
            .collect();
        ElementReader::new(&self.engine.snapshot()).trees_by_roots(&readable)
    }

    /// # Errors
    /// [`EngineError::Denied`] or [`EngineError::NotFound`].
    pub fn components(&self, ctx: &OperationContext, id: NodeId) -> EngineResult<ComponentListing> {
        self.on_node(ctx, permission::QUERY, id)?;
        ElementReader::new(&self.engine.snapshot()).components(id)
    }

    /// Root-level nodes of `workspace`, by name
    ///
    /// # Errors
    /// [`EngineError::Denied`].
    pub fn workspace_roots(
        &self,
        ctx: &OperationContext,
        workspace: &WorkspaceId,
        element_type: Option<ElementType>,
    ) -> EngineResult<Vec<Node>> {
        self.authorize(
            ctx,
            Authorization::new(permission::QUERY, Scope::Workspace(workspace.clone())),
        )?;
        let tables = self.engine.snapshot();
        Ok(ElementReader::new(&tables)
            .workspace_roots(workspace, element_type)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Compile the tree at `root`, prepending resolved variables if asked
    ///
    /// # Errors
    /// [`EngineError::Denied`], or [`EngineError::Compile`] for any compile failure.
    pub fn compile(
        &self,
        ctx: &OperationContext,
        root: NodeId,
        request: &CompileRequest,
    ) -> EngineResult<ElementDocument> {
        self.on_node(ctx, permission::COMPILE, root)?;
        let compiler = TreeCompiler::new(self.engine.snapshot());
        let mut document = compiler.compile(root, &request.options)?;
        inject_variables(
            &mut document,
            &self.variables,
            &request.datasets,
            request.use_current,
            &request.additional,
        )?;
        Ok(document)
    }

    /// Compile a snippet collection on its own
    ///
    /// # Errors
    /// [`EngineError::Denied`], or [`EngineError::Compile`] for any compile failure.
    pub fn compile_snippet(&self, ctx: &OperationContext, snippet: NodeId) -> EngineResult<ElementDocument> {
        self.on_node(ctx, permission::COMPILE, snippet)?;
        Ok(TreeCompiler::new(self.engine.snapshot()).compile_snippet(snippet)?)
    }
}

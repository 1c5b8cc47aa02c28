//! Recursive tree-to-document compilation

use crate::document::ElementDocument;
use crate::engines::EngineHoist;
use crate::error::{CompileError, CompileResult, ReferenceKind};
use crate::headers::header_manager;
use crate::options::CompileOptions;
use crate::snippets::{self, SNIPPET_REF_PROPERTY};
use indexmap::IndexMap;
use scriptree_model::{ComponentCategory, ElementClass, Node, NodeId};
use scriptree_store::Tables;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-compile mutable state
struct Pass {
    options: CompileOptions,
    /// The scoped sampler has been emitted
    found_sampler: bool,
    /// Snippets currently being expanded
    expanding: HashSet<NodeId>,
    engines: EngineHoist,
}

impl Pass {
    fn new(options: CompileOptions) -> Self {
        Self {
            options,
            found_sampler: false,
            expanding: HashSet::new(),
            engines: EngineHoist::default(),
        }
    }

    /// Why `node` is left out, if it is
    fn prune_reason(&self, node: &Node) -> Option<&'static str> {
        let o = &self.options;
        if !node.enabled {
            return Some("disabled");
        }
        if node.is_group() {
            if let Some(group) = o.group {
                let scaffolding_kept = node.is_scaffolding() && !o.self_only;
                if node.id != group && !scaffolding_kept {
                    return Some("outside group scope");
                }
            }
        }
        if o.no_scaffolding && node.is_scaffolding() {
            return Some("scaffolding suppressed");
        }
        if node.is_sampler() {
            if o.no_sampler {
                return Some("samplers suppressed");
            }
            if let Some(sampler) = o.sampler {
                if node.id != sampler && (o.self_only || self.found_sampler) {
                    return Some("outside sampler scope");
                }
            }
        }
        None
    }
}

/// Read-only compiler over one consistent snapshot
///
/// Holding the snapshot for the whole compile means a concurrent mutation is
/// either fully visible or not at all.
#[derive(Debug, Clone)]
pub struct TreeCompiler {
    tables: Arc<Tables>,
}

impl TreeCompiler {
    #[inline]
    #[must_use]
    pub fn new(tables: Arc<Tables>) -> Self {
        Self { tables }
    }

    #[inline]
    #[must_use]
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Compile the tree rooted at `root`
    ///
    /// # Errors
    /// - [`CompileError::NotFound`] if `root` does not exist
    /// - [`CompileError::EmptyScript`] if `root` itself is pruned
    /// - [`CompileError::MissingReference`] for an unresolvable snippet or engine
    /// - [`CompileError::CyclicSnippet`] for self-referencing snippets
    pub fn compile(&self, root: NodeId, options: &CompileOptions) -> CompileResult<ElementDocument> {
        self.tables
            .node(root)
            .ok_or_else(|| CompileError::node_not_found(root))?;
        let mut pass = Pass::new(options.clone());
        let mut document = self
            .element(root, &mut pass)?
            .ok_or(CompileError::EmptyScript(root))?;

        let engines = pass.engines.len();
        pass.engines.prepend_to(&mut document.children);
        info!(root = %root, nodes = document.count(), engines, "tree compiled");
        Ok(document)
    }

    /// Compile a snippet collection on its own, wrapped so it runs like an
    /// ordinary collection
    ///
    /// # Errors
    /// [`CompileError::NotFound`] if `snippet` is not a snippet collection,
    /// plus any error [`TreeCompiler::compile`] can raise for its children.
    pub fn compile_snippet(&self, snippet: NodeId) -> CompileResult<ElementDocument> {
        let node = self
            .tables
            .node(snippet)
            .filter(|n| n.is_snippet())
            .ok_or_else(|| CompileError::NotFound {
                what: "snippet collection",
                id: snippet.to_string(),
            })?;
        let properties = self.tables.read_properties(snippet, false)?;

        let mut pass = Pass::new(CompileOptions::default());
        pass.expanding.insert(snippet);
        let mut children = self.children(snippet, &mut pass)?;
        if snippets::uses_session(&properties) {
            children.insert(0, ElementDocument::new("HTTPSessionManager", "HTTPSessionManager"));
        }

        let mut document = snippets::wrap(&node.name, children);
        pass.engines.prepend_to(&mut document.children);
        info!(snippet = %snippet, nodes = document.count(), "snippet compiled");
        Ok(document)
    }

    fn element(&self, id: NodeId, pass: &mut Pass) -> CompileResult<Option<ElementDocument>> {
        let node = self
            .tables
            .node(id)
            .ok_or_else(|| CompileError::node_not_found(id))?;
        if let Some(reason) = pass.prune_reason(node) {
            debug!(node = %id, name = %node.name, reason, "pruned");
            return Ok(None);
        }

        let mut properties = self.tables.read_properties(id, false)?;
        let mut children = Vec::new();

        if node.is_http_sampler() {
            children.extend(header_manager(&self.tables, node));
        }
        if node.is_sql_sampler() {
            pass.engines.rewrite(&self.tables, id, &mut properties)?;
        }

        let mut document = if node.is_snippet_sampler() {
            children.extend(self.expand_snippet(id, &properties, pass)?);
            let mut doc = ElementDocument::from_node(node, IndexMap::new());
            doc.class = ElementClass::TransactionController;
            doc
        } else {
            children.extend(self.children(id, pass)?);
            ElementDocument::from_node(node, properties)
        };

        if node.is_group() || node.is_http_sampler() {
            self.built_ins(id, &mut children, pass)?;
        }
        if node.is_sampler() && pass.options.sampler == Some(id) {
            pass.found_sampler = true;
        }

        document.children = children;
        Ok(Some(document))
    }

    fn children(&self, parent: NodeId, pass: &mut Pass) -> CompileResult<Vec<ElementDocument>> {
        let mut out = Vec::new();
        for edge in self.tables.children(parent) {
            out.extend(self.element(edge.child, pass)?);
        }
        Ok(out)
    }

    /// Attached assertions run first, every other component last
    ///
    /// Each assertion is pushed to the front as it is reached, so several
    /// assertions end up in reverse stored order.
    fn built_ins(
        &self,
        host: NodeId,
        children: &mut Vec<ElementDocument>,
        pass: &mut Pass,
    ) -> CompileResult<()> {
        for edge in self.tables.components(host) {
            let Some(doc) = self.element(edge.child, pass)? else {
                continue;
            };
            if edge.category == ComponentCategory::Assertion {
                children.insert(0, doc);
            } else {
                children.push(doc);
            }
        }
        Ok(())
    }

    /// Compile the snippet a reference points at and bind its parameters
    ///
    /// The snippet subtree is compiled without the caller's scope filters.
    fn expand_snippet(
        &self,
        reference: NodeId,
        properties: &IndexMap<String, Value>,
        pass: &mut Pass,
    ) -> CompileResult<Vec<ElementDocument>> {
        let missing = |target: String| CompileError::MissingReference {
            kind: ReferenceKind::Snippet,
            referrer: reference,
            reference: target,
        };
        let target = properties
            .get(SNIPPET_REF_PROPERTY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("<unset>".to_string()))?;
        let snippet = target
            .parse::<NodeId>()
            .ok()
            .and_then(|id| self.tables.node(id))
            .filter(|n| n.is_snippet())
            .ok_or_else(|| missing(target.to_string()))?;
        if !pass.expanding.insert(snippet.id) {
            return Err(CompileError::CyclicSnippet(snippet.id));
        }

        let scope = std::mem::take(&mut pass.options);
        let found = std::mem::replace(&mut pass.found_sampler, false);
        let compiled = self.element(snippet.id, pass);
        pass.options = scope;
        pass.found_sampler = found;
        pass.expanding.remove(&snippet.id);

        let Some(compiled) = compiled? else {
            return Ok(Vec::new());
        };
        let mut children = compiled.children;
        snippets::configure(&mut children, &compiled.properties, properties);
        Ok(children)
    }
}

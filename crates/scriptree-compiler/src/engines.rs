//! Database engine hoisting
//!
//! SQL samplers name their engine by id. During a compile each referenced
//! engine is materialized once, keyed by id, and the sampler is rewritten to
//! reference it by variable name. The collected engines are prepended to the
//! root document when the compile finishes.

use crate::document::ElementDocument;
use crate::error::{CompileError, CompileResult, ReferenceKind};
use indexmap::IndexMap;
use scriptree_model::{ElementClass, NodeId};
use scriptree_store::Tables;
use serde_json::Value;

/// Sampler property holding the engine id
pub const ENGINE_REF_PROPERTY: &str = "engineNo";
/// Sampler property the reference is rewritten to
pub const ENGINE_NAME_PROPERTY: &str = "SQLSampler__engine_name";
/// Engine attribute holding the name samplers bind to
pub const VARIABLE_NAME_ATTR: &str = "DatabaseEngine__variable_name";

const ENGINE_PREFIX: &str = "DatabaseEngine__";

/// Engines referenced so far, in first-reference order
#[derive(Debug, Default)]
pub(crate) struct EngineHoist {
    engines: IndexMap<NodeId, ElementDocument>,
}

impl EngineHoist {
    /// Rewrite a SQL sampler's properties and remember its engine
    ///
    /// # Errors
    /// [`CompileError::MissingReference`] if the reference is unset or does
    /// not name a database engine.
    pub(crate) fn rewrite(
        &mut self,
        tables: &Tables,
        sampler: NodeId,
        properties: &mut IndexMap<String, Value>,
    ) -> CompileResult<()> {
        let reference = properties
            .shift_remove(ENGINE_REF_PROPERTY)
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty());
        let missing = |reference: String| CompileError::MissingReference {
            kind: ReferenceKind::DatabaseEngine,
            referrer: sampler,
            reference,
        };
        let reference = reference.ok_or_else(|| missing("<unset>".to_string()))?;
        let engine = reference
            .parse::<NodeId>()
            .ok()
            .and_then(|id| tables.node(id))
            .filter(|n| n.class == ElementClass::DatabaseEngine)
            .ok_or_else(|| missing(reference.clone()))?;

        let variable_name = engine
            .attrs
            .get(VARIABLE_NAME_ATTR)
            .and_then(Value::as_str)
            .map_or_else(|| engine.name.clone(), str::to_string);
        properties.insert(ENGINE_NAME_PROPERTY.to_string(), Value::String(variable_name));

        self.engines.entry(engine.id).or_insert_with(|| {
            let mut doc = ElementDocument::new(engine.name.clone(), ElementClass::DatabaseEngine);
            doc.description.clone_from(&engine.description);
            doc.properties = engine
                .attrs
                .iter()
                .filter(|(k, _)| k.starts_with(ENGINE_PREFIX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            doc
        });
        Ok(())
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.engines.len()
    }

    /// Put every hoisted engine at the front of `children`
    pub(crate) fn prepend_to(self, children: &mut Vec<ElementDocument>) {
        let hoisted: Vec<ElementDocument> = self.engines.into_values().collect();
        children.splice(0..0, hoisted);
    }
}

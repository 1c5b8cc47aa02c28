//! Variable datasets and their injection into compiled documents
//!
//! Datasets are resolved into one flat name/value map, lowest weight first,
//! so a custom dataset overrides an environment one which overrides the
//! global one. The result is prepended to the document as a
//! `VariableDataset` pseudo-node.

use crate::document::{argument, ElementDocument};
use crate::error::{CompileError, CompileResult};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Property carrying the argument list of parameter-like pseudo-nodes
pub const ARGUMENTS_PROPERTY: &str = "Arguments__arguments";

/// Dataset scope; decides default precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetKind {
    Global,
    Environment,
    Custom,
}

impl DatasetKind {
    /// Default weight; lower weights are applied first
    #[inline]
    #[must_use]
    pub fn weight(self) -> u32 {
        match self {
            Self::Global => 1,
            Self::Environment => 2,
            Self::Custom => 3,
        }
    }
}

/// One variable of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    #[serde(default)]
    pub initial: String,
    #[serde(default)]
    pub current: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Variable {
    #[must_use]
    pub fn new(name: impl Into<String>, initial: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: initial.into(),
            current: String::new(),
            enabled: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_current(mut self, current: impl Into<String>) -> Self {
        self.current = current.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Current value when requested and non-empty, else initial
    #[must_use]
    pub fn value(&self, use_current: bool) -> &str {
        if use_current && !self.current.is_empty() {
            &self.current
        } else {
            &self.initial
        }
    }
}

/// Named, weighted set of variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDataset {
    pub id: String,
    pub name: String,
    pub kind: DatasetKind,
    pub weight: u32,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl VariableDataset {
    /// Empty dataset weighted by its kind
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DatasetKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            weight: kind.weight(),
            variables: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}

/// Concurrent dataset registry, keyed by dataset id
#[derive(Debug, Default)]
pub struct VariableRegistry {
    datasets: DashMap<String, Arc<VariableDataset>>,
}

impl VariableRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a dataset
    pub fn register(&self, dataset: VariableDataset) {
        self.datasets.insert(dataset.id.clone(), Arc::new(dataset));
    }

    pub fn remove(&self, id: &str) -> Option<Arc<VariableDataset>> {
        self.datasets.remove(id).map(|(_, dataset)| dataset)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<VariableDataset>> {
        self.datasets.get(id).map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Flatten the listed datasets into one map
    ///
    /// Datasets apply in ascending weight with caller order breaking ties,
    /// so later entries override earlier ones on name collision. Disabled
    /// variables are skipped.
    ///
    /// # Errors
    /// [`CompileError::NotFound`] for an unknown dataset id.
    pub fn resolve(&self, ids: &[String], use_current: bool) -> CompileResult<IndexMap<String, String>> {
        let mut datasets = ids
            .iter()
            .map(|id| {
                self.get(id).ok_or_else(|| CompileError::NotFound {
                    what: "variable dataset",
                    id: id.clone(),
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        // stable: ties keep caller order
        datasets.sort_by_key(|d| d.weight);

        let mut resolved = IndexMap::new();
        for dataset in &datasets {
            for variable in dataset.variables.iter().filter(|v| v.enabled) {
                resolved.insert(variable.name.clone(), variable.value(use_current).to_string());
            }
        }
        Ok(resolved)
    }
}

/// Resolve an additional value: `${name}` reads an already resolved
/// variable, anything else is literal
///
/// An indirection to an unknown variable resolves to `Null`.
#[must_use]
pub fn resolve_indirection(value: &str, variables: &IndexMap<String, String>) -> Value {
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => variables
            .get(name)
            .map_or(Value::Null, |v| Value::String(v.clone())),
        None => Value::String(value.to_string()),
    }
}

/// Prepend a `VariableDataset` pseudo-node to `document`'s children
///
/// Does nothing when `ids` is empty. Additional variables are appended after
/// the dataset variables and override them on collision.
///
/// # Errors
/// [`CompileError::NotFound`] for an unknown dataset id.
pub fn inject_variables(
    document: &mut ElementDocument,
    registry: &VariableRegistry,
    ids: &[String],
    use_current: bool,
    additional: &IndexMap<String, String>,
) -> CompileResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let variables = registry.resolve(ids, use_current)?;
    let mut values: IndexMap<String, Value> = variables
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    for (name, value) in additional {
        values.insert(name.clone(), resolve_indirection(value, &variables));
    }

    let arguments: Vec<Value> = values
        .into_iter()
        .map(|(name, value)| argument(&name, value))
        .collect();
    let dataset = ElementDocument::new("VariableDataset", "VariableDataset")
        .with_property(ARGUMENTS_PROPERTY, arguments);
    document.children.insert(0, dataset);
    Ok(())
}

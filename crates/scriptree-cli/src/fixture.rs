//! Fixture files: table snapshots and variable datasets, JSON or YAML

use anyhow::{Context, Result};
use scriptree_compiler::{VariableDataset, VariableRegistry};
use scriptree_store::{TableSnapshot, Tables};
use serde::de::DeserializeOwned;
use std::path::Path;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Parse `path` as YAML or JSON, chosen by extension
pub(crate) fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let parsed = if is_yaml(path) {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?
    };
    Ok(parsed)
}

/// Load and validate a table snapshot
pub(crate) fn load_tables(path: &Path) -> Result<Tables> {
    let snapshot: TableSnapshot = read(path)?;
    Tables::from_snapshot(snapshot)
        .with_context(|| format!("inconsistent snapshot in {}", path.display()))
}

/// Load a list of datasets into a fresh registry
pub(crate) fn load_datasets(path: &Path) -> Result<VariableRegistry> {
    let datasets: Vec<VariableDataset> = read(path)?;
    let registry = VariableRegistry::new();
    for dataset in datasets {
        registry.register(dataset);
    }
    Ok(registry)
}

//! Component lists supplied with create and modify requests

use scriptree_model::{ComponentCategory, NodeDraft, NodeId};
use serde::{Deserialize, Serialize};

/// One requested component
///
/// `id` names an existing component to update; `None` asks for a new one.
/// `index` orders components within their category; unindexed entries keep
/// their list order after the indexed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(flatten)]
    pub draft: NodeDraft,
}

impl ComponentSpec {
    /// New component from a draft
    #[must_use]
    pub fn new(draft: NodeDraft) -> Self {
        Self {
            id: None,
            index: None,
            draft,
        }
    }

    /// Update of an existing component
    #[must_use]
    pub fn existing(id: NodeId, draft: NodeDraft) -> Self {
        Self {
            id: Some(id),
            index: None,
            draft,
        }
    }

    /// With explicit position
    #[inline]
    #[must_use]
    pub fn at(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }
}

/// Requested components grouped by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default, rename = "confList")]
    pub configs: Vec<ComponentSpec>,
    #[serde(default, rename = "prevList")]
    pub pre_processors: Vec<ComponentSpec>,
    #[serde(default, rename = "postList")]
    pub post_processors: Vec<ComponentSpec>,
    #[serde(default, rename = "testList")]
    pub assertions: Vec<ComponentSpec>,
}

impl Components {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
            && self.pre_processors.is_empty()
            && self.post_processors.is_empty()
            && self.assertions.is_empty()
    }

    /// Add a spec to the list of its draft's category
    ///
    /// Drafts whose type cannot be attached go to the config list and are
    /// rejected when the request is applied.
    #[must_use]
    pub fn with(mut self, spec: ComponentSpec) -> Self {
        match ComponentCategory::from_element_type(spec.draft.element_type) {
            Some(ComponentCategory::PreProcessor) => self.pre_processors.push(spec),
            Some(ComponentCategory::PostProcessor) => self.post_processors.push(spec),
            Some(ComponentCategory::Assertion) => self.assertions.push(spec),
            Some(ComponentCategory::Config) | None => self.configs.push(spec),
        }
        self
    }

    /// Each category with its specs in requested order
    #[must_use]
    pub fn ordered(&self) -> Vec<(ComponentCategory, Vec<&ComponentSpec>)> {
        [
            (ComponentCategory::Config, &self.configs),
            (ComponentCategory::PreProcessor, &self.pre_processors),
            (ComponentCategory::PostProcessor, &self.post_processors),
            (ComponentCategory::Assertion, &self.assertions),
        ]
        .into_iter()
        .map(|(category, list)| {
            let mut specs: Vec<&ComponentSpec> = list.iter().collect();
            specs.sort_by_key(|s| s.index.unwrap_or(u32::MAX));
            (category, specs)
        })
        .collect()
    }
}

//! Compiled execution document

use indexmap::IndexMap;
use scriptree_model::{ElementClass, Node};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One node of a compiled tree
///
/// Documents carry no identifiers: the executor only needs names, classes,
/// properties and order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub class: ElementClass,
    pub enabled: bool,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(default)]
    pub children: Vec<ElementDocument>,
}

impl ElementDocument {
    /// Enabled document with no properties or children
    #[must_use]
    pub fn new(name: impl Into<String>, class: impl Into<ElementClass>) -> Self {
        Self {
            name: name.into(),
            description: None,
            class: class.into(),
            enabled: true,
            properties: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Document shell for a stored node
    #[must_use]
    pub fn from_node(node: &Node, properties: IndexMap<String, Value>) -> Self {
        Self {
            name: node.name.clone(),
            description: node.description.clone(),
            class: node.class.clone(),
            enabled: node.enabled,
            properties,
            children: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: ElementDocument) -> Self {
        self.children.push(child);
        self
    }

    /// Property as a string slice, if present and a string
    #[must_use]
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Depth-first search by class
    #[must_use]
    pub fn find_class(&self, class: &str) -> Option<&ElementDocument> {
        if self.class.as_str() == class {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_class(class))
    }

    /// Number of documents in this subtree, self included
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ElementDocument::count).sum::<usize>()
    }
}

/// `{class, property}` entry used inside list-valued properties
pub(crate) fn entry(class: &str, property: Value) -> Value {
    json!({ "class": class, "property": property })
}

/// Argument entry for parameter and variable pseudo-nodes
pub(crate) fn argument(name: &str, value: Value) -> Value {
    entry(
        "Argument",
        json!({ "Argument__name": name, "Argument__value": value }),
    )
}

//! Nodes of the script tree
//!
//! A [`Node`] is the atomic unit of a script: a collection, group, sampler,
//! controller or one of the auxiliary kinds. Its category is an
//! [`ElementType`]; the concrete implementation is an [`ElementClass`].

use crate::id::{NodeId, WorkspaceId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Node-intrinsic attribute blob (not a property)
pub type Attributes = Map<String, Value>;

/// Property values supplied by callers, keyed by property name
pub type PropertyMap = Map<String, Value>;

/// Node category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    /// Top-level container (test collection or snippet collection)
    Collection,
    /// Worker group, the "case" level of a script
    Group,
    /// Request issuer
    Sampler,
    /// Logic controller (loop, if, while, transaction)
    Controller,
    /// Configuration element
    Config,
    /// Timer
    Timer,
    /// Runs before the host
    PreProcessor,
    /// Runs after the host
    PostProcessor,
    /// Result assertion
    Assertion,
    /// Result listener
    Listener,
}

impl ElementType {
    /// All categories in declaration order
    pub const ALL: [ElementType; 10] = [
        ElementType::Collection,
        ElementType::Group,
        ElementType::Sampler,
        ElementType::Controller,
        ElementType::Config,
        ElementType::Timer,
        ElementType::PreProcessor,
        ElementType::PostProcessor,
        ElementType::Assertion,
        ElementType::Listener,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "COLLECTION",
            Self::Group => "GROUP",
            Self::Sampler => "SAMPLER",
            Self::Controller => "CONTROLLER",
            Self::Config => "CONFIG",
            Self::Timer => "TIMER",
            Self::PreProcessor => "PRE_PROCESSOR",
            Self::PostProcessor => "POST_PROCESSOR",
            Self::Assertion => "ASSERTION",
            Self::Listener => "LISTENER",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = crate::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::ModelError::UnknownElementType(s.to_string()))
    }
}

/// Concrete implementation class of a node
///
/// Known classes get their own variant so the engine and compiler can match
/// on them; anything else is carried verbatim in [`ElementClass::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementClass {
    TestCollection,
    TestSnippets,
    TestGroup,
    SetupGroup,
    TeardownGroup,
    HttpSampler,
    PythonSampler,
    SnippetSampler,
    SqlSampler,
    HttpHeaderManager,
    HttpHeaderTemplate,
    DatabaseEngine,
    LoopController,
    IfController,
    WhileController,
    TransactionController,
    PythonPreProcessor,
    PythonPostProcessor,
    JsonPathExtractor,
    PythonAssertion,
    JsonPathAssertion,
    /// Class not known to the engine
    Custom(String),
}

impl ElementClass {
    const KNOWN: [(ElementClass, &'static str); 21] = [
        (ElementClass::TestCollection, "TestCollection"),
        (ElementClass::TestSnippets, "TestSnippets"),
        (ElementClass::TestGroup, "TestGroup"),
        (ElementClass::SetupGroup, "SetupGroup"),
        (ElementClass::TeardownGroup, "TeardownGroup"),
        (ElementClass::HttpSampler, "HTTPSampler"),
        (ElementClass::PythonSampler, "PythonSampler"),
        (ElementClass::SnippetSampler, "SnippetSampler"),
        (ElementClass::SqlSampler, "SQLSampler"),
        (ElementClass::HttpHeaderManager, "HTTPHeaderManager"),
        (ElementClass::HttpHeaderTemplate, "HTTPHeaderTemplate"),
        (ElementClass::DatabaseEngine, "DatabaseEngine"),
        (ElementClass::LoopController, "LoopController"),
        (ElementClass::IfController, "IfController"),
        (ElementClass::WhileController, "WhileController"),
        (ElementClass::TransactionController, "TransactionController"),
        (ElementClass::PythonPreProcessor, "PythonPreProcessor"),
        (ElementClass::PythonPostProcessor, "PythonPostProcessor"),
        (ElementClass::JsonPathExtractor, "JsonPathExtractor"),
        (ElementClass::PythonAssertion, "PythonAssertion"),
        (ElementClass::JsonPathAssertion, "JsonPathAssertion"),
    ];

    /// Class name as stored and emitted
    #[must_use]
    pub fn as_str(&self) -> &str {
        if let Self::Custom(name) = self {
            return name;
        }
        Self::KNOWN
            .iter()
            .find(|(class, _)| class == self)
            .map_or("", |(_, name)| name)
    }

    /// Parse a class name, falling back to [`ElementClass::Custom`]
    #[must_use]
    pub fn parse(name: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|(_, known)| *known == name)
            .map_or_else(|| Self::Custom(name.to_string()), |(class, _)| class.clone())
    }
}

impl From<String> for ElementClass {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<&str> for ElementClass {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<ElementClass> for String {
    fn from(class: ElementClass) -> Self {
        class.as_str().to_string()
    }
}

impl fmt::Display for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored node
///
/// # Invariants
/// - `id` is unique across the whole store
/// - `workspace` is only set on root-level collections, snippets and configs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub element_type: ElementType,
    pub class: ElementClass,
    pub enabled: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub attrs: Attributes,
    #[serde(default)]
    pub workspace: Option<WorkspaceId>,
}

impl Node {
    /// Materialize a draft under a freshly allocated identifier
    #[must_use]
    pub fn from_draft(id: NodeId, draft: &NodeDraft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            element_type: draft.element_type,
            class: draft.class.clone(),
            enabled: draft.enabled,
            skipped: false,
            attrs: draft.attrs.clone(),
            workspace: None,
        }
    }

    /// Ordinary test collection (not a snippet collection)
    #[inline]
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.element_type == ElementType::Collection && !self.is_snippet()
    }

    /// Reusable snippet collection
    #[inline]
    #[must_use]
    pub fn is_snippet(&self) -> bool {
        self.class == ElementClass::TestSnippets
    }

    /// Worker group (the "case" level)
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.element_type == ElementType::Group
    }

    #[inline]
    #[must_use]
    pub fn is_sampler(&self) -> bool {
        self.element_type == ElementType::Sampler
    }

    #[inline]
    #[must_use]
    pub fn is_controller(&self) -> bool {
        self.element_type == ElementType::Controller
    }

    #[inline]
    #[must_use]
    pub fn is_timer(&self) -> bool {
        self.element_type == ElementType::Timer
    }

    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        self.element_type == ElementType::Config
    }

    #[inline]
    #[must_use]
    pub fn is_http_sampler(&self) -> bool {
        self.class == ElementClass::HttpSampler
    }

    #[inline]
    #[must_use]
    pub fn is_sql_sampler(&self) -> bool {
        self.class == ElementClass::SqlSampler
    }

    #[inline]
    #[must_use]
    pub fn is_snippet_sampler(&self) -> bool {
        self.class == ElementClass::SnippetSampler
    }

    /// Setup or teardown group
    #[inline]
    #[must_use]
    pub fn is_scaffolding(&self) -> bool {
        matches!(
            self.class,
            ElementClass::SetupGroup | ElementClass::TeardownGroup
        )
    }

    /// Kinds that live at the top of a tree and belong to a workspace
    #[inline]
    #[must_use]
    pub fn is_workspace_bound(&self) -> bool {
        self.element_type == ElementType::Collection || self.is_config()
    }
}

/// Caller-supplied content for a new node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub element_type: ElementType,
    pub class: ElementClass,
    #[serde(default)]
    pub attrs: Attributes,
    #[serde(default)]
    pub props: PropertyMap,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl NodeDraft {
    /// Create an enabled draft with no attributes or properties
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        element_type: ElementType,
        class: impl Into<ElementClass>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            element_type,
            class: class.into(),
            attrs: Attributes::new(),
            props: PropertyMap::new(),
            enabled: true,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With a property value
    #[inline]
    #[must_use]
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// With an attribute value
    #[inline]
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Disabled draft
    #[inline]
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

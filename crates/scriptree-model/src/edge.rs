//! Edges of the two adjacency relations
//!
//! [`ChildEdge`] is the ordinary structural relation; [`ComponentEdge`]
//! attaches auxiliary nodes to a host and is ordered per category.

use crate::element::ElementType;
use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural parent -> child edge
///
/// # Invariants
/// - For a fixed `parent`, `sort` values are exactly `1..=N`
/// - `root` equals the top-most ancestor of `child`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEdge {
    pub root: NodeId,
    pub parent: NodeId,
    pub child: NodeId,
    /// 1-based sibling position
    pub sort: u32,
}

/// Category of an attached component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentCategory {
    Config,
    PreProcessor,
    PostProcessor,
    Assertion,
}

impl ComponentCategory {
    /// All categories in emission order
    pub const ALL: [ComponentCategory; 4] = [
        ComponentCategory::Config,
        ComponentCategory::PreProcessor,
        ComponentCategory::PostProcessor,
        ComponentCategory::Assertion,
    ];

    /// Component category for an element type, if it can be attached
    #[must_use]
    pub fn from_element_type(element_type: ElementType) -> Option<Self> {
        match element_type {
            ElementType::Config => Some(Self::Config),
            ElementType::PreProcessor => Some(Self::PreProcessor),
            ElementType::PostProcessor => Some(Self::PostProcessor),
            ElementType::Assertion => Some(Self::Assertion),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "CONFIG",
            Self::PreProcessor => "PRE_PROCESSOR",
            Self::PostProcessor => "POST_PROCESSOR",
            Self::Assertion => "ASSERTION",
        };
        f.write_str(s)
    }
}

/// Host -> component attachment, ordered per (parent, category)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEdge {
    pub root: NodeId,
    pub parent: NodeId,
    pub child: NodeId,
    pub category: ComponentCategory,
    /// 1-based position within the category
    pub sort: u32,
}

/// Where a node sits in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "relation", rename_all = "lowercase")]
pub enum Position {
    /// No incoming edge: the node is a root
    Root,
    /// Structural child
    Child(ChildEdge),
    /// Attached component
    Component(ComponentEdge),
}

impl Position {
    /// Parent of the node, if any
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Self::Root => None,
            Self::Child(edge) => Some(edge.parent),
            Self::Component(edge) => Some(edge.parent),
        }
    }

    /// Cached root of the node's tree, if it has an incoming edge
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        match self {
            Self::Root => None,
            Self::Child(edge) => Some(edge.root),
            Self::Component(edge) => Some(edge.root),
        }
    }
}

//! Scriptree Model - element tree data types
//!
//! The flat relational shape of a stored test script:
//! - [`Node`]: one element of the tree, with category and class
//! - [`Property`]: typed per-node key/value records
//! - [`ChildEdge`] / [`ComponentEdge`]: the two ordered adjacency relations
//! - [`ChangeLogEntry`]: append-only audit record
//!
//! # Core Concepts
//!
//! Nodes never hold pointers to each other. Structure lives entirely in the
//! edge relations, each edge carrying a dense 1-based sibling index and the
//! cached identifier of its tree's root.
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptree_model::prelude::*;
//!
//! let draft = NodeDraft::new("login", ElementType::Sampler, "HTTPSampler")
//!     .with_prop("HTTPSampler__url", "https://example.test/login");
//! let node = Node::from_draft(NodeId::new(), &draft);
//! assert!(node.is_http_sampler());
//! ```

#![warn(unreachable_pub)]

pub mod changelog;
pub mod edge;
pub mod element;
pub mod error;
pub mod id;
pub mod property;

pub use changelog::{
    Change, ChangeLogEntry, OperationKind, DESC_FIELD, ENABLED_FIELD, NAME_FIELD, SKIPPED_FIELD,
};
pub use edge::{ChildEdge, ComponentCategory, ComponentEdge, Position};
pub use element::{Attributes, ElementClass, ElementType, Node, NodeDraft, PropertyMap};
pub use error::ModelError;
pub use id::{IdGenerator, NodeId, UlidGenerator, WorkspaceId};
pub use property::{Property, PropertyType};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the element model
    pub use crate::{
        Change, ChangeLogEntry, ChildEdge, ComponentCategory, ComponentEdge, ElementClass,
        ElementType, IdGenerator, Node, NodeDraft, NodeId, OperationKind, Property, PropertyType,
        UlidGenerator, WorkspaceId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

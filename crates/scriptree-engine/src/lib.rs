//! Scriptree Engine - structural editing of element trees
//!
//! Transactional tree operations over an [`ElementStore`]:
//! - [`MutationEngine`]: create, modify, delete, move, duplicate, paste,
//!   state changes and workspace transfers
//! - [`ElementReader`]: read-only queries over one snapshot
//! - [`ElementService`]: permission-checked facade, including compilation
//!
//! # Core Concepts
//!
//! Each operation is one unit of work. Sibling indexes under every parent
//! stay dense `1..=n` after every committed operation; any failure discards
//! all staged changes. Change-log entries go to the [`AuditSink`] after
//! commit, and a failing sink never fails the operation.
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptree_engine::prelude::*;
//!
//! let engine = MutationEngine::new(Arc::new(ElementStore::new()));
//! let ctx = OperationContext::new("alice").in_workspace("w1");
//! let collection = engine.create(&ctx, None, &NodeDraft::new("smoke", ElementType::Collection, "TestCollection"), None)?;
//! let group = engine.create(&ctx, Some(collection), &NodeDraft::new("users", ElementType::Group, "TestGroup"), None)?;
//! engine.move_node(&ctx, group, collection, 0)?;
//! ```
//!
//! [`ElementStore`]: scriptree_store::ElementStore
//! [`AuditSink`]: scriptree_audit::AuditSink

#![warn(unreachable_pub)]

pub mod auth;
pub mod components;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod query;
pub mod rules;
pub mod service;
mod tx;

pub use auth::{permission, AllowAll, Authorization, PermissionCheck, Scope, WorkspaceAllowList};
pub use components::{ComponentSpec, Components};
pub use config::EngineConfig;
pub use context::OperationContext;
pub use engine::{ModifyRequest, MutationEngine};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use query::{ComponentInfo, ComponentListing, ElementReader, NodeInfo, TreeNode};
pub use rules::{check_placement, PasteMode};
pub use service::{CompileRequest, ElementService};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        Components, ComponentSpec, EngineConfig, EngineError, ElementService, ModifyRequest,
        MutationEngine, OperationContext, PasteMode,
    };
    pub use scriptree_model::{ElementType, NodeDraft, NodeId, WorkspaceId};
    pub use scriptree_store::ElementStore;
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

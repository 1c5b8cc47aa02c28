//! Scriptree Store - tables, property store and adjacency model
//!
//! # Core Concepts
//!
//! - [`Tables`]: arena of nodes plus the child and component relations
//! - Property store: typed upsert, reconciliation and decoding on [`Tables`]
//! - [`ElementStore`]: the transaction boundary. Every mutation runs inside
//!   [`ElementStore::unit_of_work`] and either commits whole or not at all
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptree_store::ElementStore;
//!
//! let store = ElementStore::new();
//! store.unit_of_work(|tables| {
//!     tables.insert_node(node)?;
//!     tables.append_child(parent, node_id, root)?;
//!     Ok::<_, scriptree_store::StoreError>(())
//! })?;
//! let snapshot = store.snapshot();
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod integrity;
pub mod properties;
pub mod snapshot;
pub mod store;
pub mod tables;

pub use error::StoreError;
pub use integrity::Violation;
pub use properties::PropertyChange;
pub use snapshot::{PropertyRow, TableSnapshot};
pub use store::ElementStore;
pub use tables::{is_dense, Tables};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

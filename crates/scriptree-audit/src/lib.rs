//! Scriptree Audit - change audit emission
//!
//! Every mutation produces [`ChangeLogEntry`] records describing who changed
//! what, where in which tree, and when. Emission is a side channel: entries
//! are recorded while the unit of work runs and published only after it
//! commits, and a failing sink never aborts the mutation.
//!
//! # Core Concepts
//!
//! - [`AncestryCache`]: memoized root/case/parent lookups for one operation
//! - [`ChangeRecorder`]: per-operation entry builder
//! - [`AuditSink`]: durable destination ([`MemoryAuditSink`], [`TracingAuditSink`])
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptree_audit::{publish, ChangeRecorder, MemoryAuditSink};
//!
//! let sink = MemoryAuditSink::new();
//! let mut recorder = ChangeRecorder::new("alice", None);
//! recorder.record(&tables, Change::insert(node_id));
//! publish(&sink, &recorder.finish());
//! sink.verify_integrity()?;
//! ```

#![warn(unreachable_pub)]

pub mod ancestry;
pub mod error;
pub mod recorder;
pub mod sink;

pub use ancestry::{Ancestry, AncestryCache};
pub use error::AuditError;
pub use recorder::{publish, ChangeRecorder};
pub use scriptree_model::ChangeLogEntry;
pub use sink::{AuditSink, ChainedEntry, MemoryAuditSink, TracingAuditSink};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

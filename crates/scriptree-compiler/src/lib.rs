//! Scriptree Compiler - stored trees to execution documents
//!
//! Turns a root node into a nested, fully resolved [`ElementDocument`]:
//! - disabled and out-of-scope nodes are pruned, not marked
//! - HTTP samplers get their header templates flattened into a manager child
//! - SQL samplers have their database engine hoisted, once per engine
//! - snippet references are expanded with parameter binding
//! - attached assertions run first, other attached components last
//!
//! # Core Concepts
//!
//! The compiler is read-only. It holds one [`Tables`](scriptree_store::Tables)
//! snapshot for the whole compile and never writes back. Compilation is
//! all-or-nothing: any unresolved reference aborts with a [`CompileError`].
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptree_compiler::{CompileOptions, TreeCompiler};
//!
//! let compiler = TreeCompiler::new(store.snapshot());
//! let document = compiler.compile(collection, &CompileOptions::new().for_group(group))?;
//! println!("{}", serde_json::to_string_pretty(&document)?);
//! ```

#![warn(unreachable_pub)]

pub mod compiler;
pub mod document;
pub mod engines;
pub mod error;
pub mod headers;
pub mod options;
pub mod snippets;
pub mod variables;

pub use compiler::TreeCompiler;
pub use document::ElementDocument;
pub use error::{CompileError, CompileResult, ReferenceKind};
pub use options::CompileOptions;
pub use variables::{
    inject_variables, resolve_indirection, DatasetKind, Variable, VariableDataset,
    VariableRegistry,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Testing utilities for the Scriptree workspace
//!
//! Shared fixtures, deterministic ids and audit doubles.

#![allow(missing_docs)]

use scriptree_audit::{AuditError, AuditSink};
use scriptree_model::{
    ChangeLogEntry, ComponentCategory, ElementType, IdGenerator, NodeDraft, NodeId, WorkspaceId,
};
use scriptree_store::{ElementStore, Tables};
use serde_json::json;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use ulid::Ulid;

/// Ids counting up from 1; ordering follows creation order
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting after `n`, to stay clear of ids handed out elsewhere
    pub fn starting_after(n: u64) -> Self {
        Self {
            next: AtomicU64::new(n),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        NodeId(Ulid::from_parts(0, u128::from(n)))
    }
}

/// Sink that rejects every entry, counting the attempts
#[derive(Debug, Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl AuditSink for FailingSink {
    fn record(&self, _: &ChangeLogEntry) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(AuditError::Unavailable("sink offline".into()))
    }
}

/// Drafts for the node kinds tests use most
pub mod drafts {
    use super::*;

    pub fn collection(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Collection, "TestCollection")
    }

    pub fn snippets(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Collection, "TestSnippets")
    }

    pub fn group(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Group, "TestGroup")
    }

    pub fn setup_group(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Group, "SetupGroup")
    }

    pub fn teardown_group(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Group, "TeardownGroup")
    }

    pub fn http_sampler(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Sampler, "HTTPSampler")
            .with_prop("HTTPSampler__method", "GET")
            .with_prop("HTTPSampler__url", format!("https://example.test/{name}"))
    }

    pub fn python_sampler(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Sampler, "PythonSampler")
    }

    pub fn sql_sampler(name: &str, engine: NodeId) -> NodeDraft {
        NodeDraft::new(name, ElementType::Sampler, "SQLSampler")
            .with_prop("engineNo", engine.to_string())
            .with_prop("SQLSampler__statement", "select 1")
    }

    pub fn snippet_sampler(name: &str, snippet: NodeId) -> NodeDraft {
        NodeDraft::new(name, ElementType::Sampler, "SnippetSampler")
            .with_prop("snippetNo", snippet.to_string())
    }

    pub fn loop_controller(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Controller, "LoopController")
            .with_prop("LoopController__loops", "1")
    }

    pub fn timer(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Timer, "ConstantTimer")
    }

    pub fn assertion(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Assertion, "JsonPathAssertion")
    }

    pub fn pre_processor(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::PreProcessor, "PythonPreProcessor")
    }

    pub fn post_processor(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::PostProcessor, "JsonPathExtractor")
    }

    pub fn database_engine(name: &str, variable: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Config, "DatabaseEngine")
            .with_attr("DatabaseEngine__variable_name", variable)
            .with_attr("DatabaseEngine__database_type", "postgresql")
            .with_attr("DatabaseEngine__host", "db.test")
            .with_attr("DatabaseEngine__port", "5432")
    }

    /// Template with one enabled and one disabled header
    pub fn header_template(name: &str) -> NodeDraft {
        NodeDraft::new(name, ElementType::Config, "HTTPHeaderTemplate").with_attr(
            "HTTPHeaderTemplate__headers",
            json!([
                {"name": "Accept", "value": "application/json", "desc": "", "enabled": true},
                {"name": "X-Debug", "value": "1", "desc": "", "enabled": false},
            ]),
        )
    }
}

/// Builds a [`Tables`] fixture directly, bypassing the engine and audit
#[derive(Debug, Default)]
pub struct TreeFixture {
    tables: Tables,
    ids: Arc<SequentialIds>,
}

impl TreeFixture {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, draft: &NodeDraft, workspace: Option<WorkspaceId>) -> NodeId {
        let id = self.ids.next_id();
        let mut node = scriptree_model::Node::from_draft(id, draft);
        node.workspace = workspace;
        self.tables.insert_node(node).unwrap();
        for (name, value) in &draft.props {
            self.tables.set_property(id, name, value).unwrap();
        }
        id
    }

    /// Root-level node without a workspace
    pub fn root(&mut self, draft: NodeDraft) -> NodeId {
        self.insert(&draft, None)
    }

    /// Root-level node bound to `workspace`
    pub fn root_in(&mut self, draft: NodeDraft, workspace: &str) -> NodeId {
        self.insert(&draft, Some(WorkspaceId::new(workspace)))
    }

    /// Append a structural child
    pub fn child(&mut self, parent: NodeId, draft: NodeDraft) -> NodeId {
        let id = self.insert(&draft, None);
        let root = self.tables.root_of(parent);
        self.tables.append_child(parent, id, root).unwrap();
        id
    }

    /// Attach a component, category taken from the draft's type
    pub fn component(&mut self, host: NodeId, draft: NodeDraft) -> NodeId {
        let category = ComponentCategory::from_element_type(draft.element_type)
            .expect("draft type cannot be attached as a component");
        let id = self.insert(&draft, None);
        let root = self.tables.root_of(host);
        self.tables.attach_component(host, id, root, category).unwrap();
        id
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }

    /// Generator continuing after the fixture's ids
    pub fn ids(&self) -> Arc<SequentialIds> {
        Arc::clone(&self.ids)
    }

    pub fn into_tables(self) -> Tables {
        self.tables
    }

    pub fn into_store(self) -> ElementStore {
        ElementStore::from_tables(self.tables)
    }
}

/// Collection > group > three HTTP samplers `s1`, `s2`, `s3`
pub struct ThreeSamplers {
    pub collection: NodeId,
    pub group: NodeId,
    pub samplers: [NodeId; 3],
}

pub fn three_samplers(fixture: &mut TreeFixture, workspace: &str) -> ThreeSamplers {
    let collection = fixture.root_in(drafts::collection("c"), workspace);
    let group = fixture.child(collection, drafts::group("g"));
    let samplers = ["s1", "s2", "s3"].map(|n| fixture.child(group, drafts::http_sampler(n)));
    ThreeSamplers {
        collection,
        group,
        samplers,
    }
}

/// Names of the children of `parent` in sort order
pub fn child_names(tables: &Tables, parent: NodeId) -> Vec<String> {
    tables
        .children(parent)
        .iter()
        .filter_map(|e| tables.node(e.child))
        .map(|n| n.name.clone())
        .collect()
}

/// Sort indexes of the children of `parent` in sort order
pub fn child_sorts(tables: &Tables, parent: NodeId) -> Vec<u32> {
    tables.children(parent).iter().map(|e| e.sort).collect()
}

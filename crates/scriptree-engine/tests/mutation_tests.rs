use pretty_assertions::assert_eq;
use scriptree_audit::MemoryAuditSink;
use scriptree_engine::{
    ComponentSpec, Components, EngineConfig, ErrorKind, ModifyRequest, MutationEngine,
    OperationContext, PasteMode,
};
use scriptree_model::{
    ElementType, NodeDraft, NodeId, OperationKind, Position, WorkspaceId, ENABLED_FIELD,
    NAME_FIELD, SKIPPED_FIELD,
};
use scriptree_test_utils::{
    child_names, child_sorts, drafts, three_samplers, FailingSink, TreeFixture,
};
use serde_json::{json, Map};
use std::sync::Arc;

struct Harness {
    engine: MutationEngine,
    sink: Arc<MemoryAuditSink>,
    ctx: OperationContext,
}

impl Harness {
    fn new(fixture: TreeFixture) -> Self {
        Self::with_config(fixture, EngineConfig::default())
    }

    fn with_config(fixture: TreeFixture, config: EngineConfig) -> Self {
        let ids = fixture.ids();
        let sink = Arc::new(MemoryAuditSink::new());
        let engine = MutationEngine::new(Arc::new(fixture.into_store()))
            .with_id_generator(ids)
            .with_audit_sink(sink.clone())
            .with_config(config);
        Self {
            engine,
            sink,
            ctx: OperationContext::new("alice").in_workspace("w1"),
        }
    }

    fn kinds(&self) -> Vec<OperationKind> {
        self.sink.entries().iter().map(|e| e.kind()).collect()
    }
}

#[test]
fn test_create_appends_and_binds_workspace() {
    let h = Harness::new(TreeFixture::new());
    let collection = h
        .engine
        .create(&h.ctx, None, &drafts::collection("c"), None)
        .unwrap();
    let g1 = h
        .engine
        .create(&h.ctx, Some(collection), &drafts::group("g1"), None)
        .unwrap();
    let components = Components::new()
        .with(ComponentSpec::new(drafts::assertion("ok")))
        .with(ComponentSpec::new(drafts::pre_processor("prep")));
    let g2 = h
        .engine
        .create(&h.ctx, Some(collection), &drafts::group("g2"), Some(&components))
        .unwrap();

    let tables = h.engine.snapshot();
    assert_eq!(
        tables.node(collection).unwrap().workspace,
        Some(WorkspaceId::new("w1"))
    );
    assert!(tables.node(g1).unwrap().workspace.is_none());
    assert_eq!(child_sorts(&tables, collection), [1, 2]);
    assert_eq!(tables.child_edge(g2).unwrap().root, collection);
    assert_eq!(tables.components(g2).len(), 2);
    assert!(tables.components(g2).iter().all(|e| e.root == collection));

    assert_eq!(h.kinds(), vec![OperationKind::Insert; 5]);
    let entries = h.sink.entries();
    assert_eq!(entries[0].operation_by, "alice");
    assert_eq!(entries[1].root, Some(collection));
    h.sink.verify_integrity().unwrap();
}

#[test]
fn test_create_under_missing_parent_commits_nothing() {
    let h = Harness::new(TreeFixture::new());
    let err = h
        .engine
        .create(&h.ctx, Some(NodeId::new()), &drafts::group("g"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.engine.snapshot().is_empty());
    assert!(h.sink.is_empty());
}

#[test]
fn test_create_rejects_component_in_wrong_list() {
    let h = Harness::new(TreeFixture::new());
    let components = Components {
        assertions: vec![ComponentSpec::new(drafts::pre_processor("misfiled"))],
        ..Components::default()
    };
    let err = h
        .engine
        .create(&h.ctx, None, &drafts::collection("c"), Some(&components))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.engine.snapshot().is_empty());
    assert!(h.sink.is_empty());
}

fn props(value: serde_json::Value) -> Map<String, serde_json::Value> {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_modify_audits_each_change() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let s = t.samplers[0];
    let h = Harness::new(f);

    let request = ModifyRequest::named("renamed")
        .with_description("hits the login page")
        .with_attrs(props(json!({"HTTPSampler__header_templates": []})))
        .with_props(props(json!({"HTTPSampler__method": "POST", "HTTPSampler__body": "{}"})));
    h.engine.modify(&h.ctx, s, &request).unwrap();

    let entries = h.sink.entries();
    assert!(entries.iter().all(|e| e.kind() == OperationKind::Update));
    let fields: Vec<String> = entries
        .iter()
        .map(|e| {
            e.change
                .prop_name
                .clone()
                .or_else(|| e.change.attr_name.clone())
                .unwrap()
        })
        .collect();
    assert_eq!(fields.len(), 6);
    assert!(fields.contains(&NAME_FIELD.to_string()));
    assert!(fields.contains(&"HTTPSampler__header_templates".to_string()));
    assert!(fields.contains(&"HTTPSampler__body".to_string()));

    let removal = entries
        .iter()
        .find(|e| e.change.prop_name.as_deref() == Some("HTTPSampler__url"))
        .unwrap();
    assert!(removal.change.old_value.is_some());
    assert!(removal.change.new_value.is_none());
    assert_eq!(removal.case, Some(t.group));

    let tables = h.engine.snapshot();
    let node = tables.node(s).unwrap();
    assert_eq!(node.name, "renamed");
    assert_eq!(node.description.as_deref(), Some("hits the login page"));
    let stored = tables.read_properties(s, true).unwrap();
    assert_eq!(stored.get("HTTPSampler__method"), Some(&json!("POST")));
    assert!(!stored.contains_key("HTTPSampler__url"));
}

#[test]
fn test_modify_can_skip_removal_audit() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let h = Harness::with_config(
        f,
        EngineConfig::default().with_audit_property_removals(false),
    );
    let request = ModifyRequest::named("s1")
        .with_props(props(json!({"HTTPSampler__method": "GET"})));
    h.engine.modify(&h.ctx, t.samplers[0], &request).unwrap();

    assert!(h.sink.is_empty());
    let stored = h.engine.snapshot().read_properties(t.samplers[0], true).unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_modify_reconciles_components() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let a1 = f.component(t.group, drafts::assertion("a1"));
    let pre = f.component(t.group, drafts::pre_processor("pre"));
    let h = Harness::new(f);

    let components = Components::new()
        .with(ComponentSpec::existing(a1, drafts::assertion("a1-renamed")).at(2))
        .with(ComponentSpec::new(drafts::assertion("a0")).at(1));
    h.engine
        .modify(
            &h.ctx,
            t.group,
            &ModifyRequest::named("g").with_components(components),
        )
        .unwrap();

    let tables = h.engine.snapshot();
    let listing = scriptree_engine::ElementReader::new(&tables)
        .components(t.group)
        .unwrap();
    let names: Vec<&str> = listing.assertions.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["a0", "a1-renamed"]);
    assert_eq!(listing.assertions[1].index, 2);
    assert!(listing.pre_processors.is_empty());
    assert!(tables.node(pre).is_none());

    let kinds = h.kinds();
    assert!(kinds.contains(&OperationKind::Insert));
    assert!(kinds.contains(&OperationKind::Delete));
    let rename = h
        .sink
        .entries()
        .into_iter()
        .find(|e| e.change.prop_name.as_deref() == Some(NAME_FIELD))
        .unwrap();
    assert_eq!(rename.element(), a1);
}

#[test]
fn test_failed_modify_rolls_back() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let h = Harness::new(f);
    let components = Components {
        assertions: vec![ComponentSpec::new(drafts::timer("wrong"))],
        ..Components::default()
    };
    let err = h
        .engine
        .modify(
            &h.ctx,
            t.group,
            &ModifyRequest::named("renamed").with_components(components),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.engine.snapshot().node(t.group).unwrap().name, "g");
    assert!(h.sink.is_empty());
}

#[test]
fn test_modify_missing_node() {
    let h = Harness::new(TreeFixture::new());
    let err = h
        .engine
        .modify(&h.ctx, NodeId::new(), &ModifyRequest::named("x"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_delete_cascades_and_closes_gap() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let timer = f.child(t.samplers[0], drafts::timer("wait"));
    let check = f.component(t.samplers[0], drafts::assertion("check"));
    let h = Harness::new(f);

    h.engine.delete(&h.ctx, t.samplers[0]).unwrap();

    let tables = h.engine.snapshot();
    for gone in [t.samplers[0], timer, check] {
        assert!(tables.node(gone).is_none());
        assert!(tables.child_edge(gone).is_none());
        assert!(tables.component_edge(gone).is_none());
        assert_eq!(tables.properties(gone).count(), 0);
    }
    assert_eq!(child_names(&tables, t.group), ["s2", "s3"]);
    assert_eq!(child_sorts(&tables, t.group), [1, 2]);
    assert!(tables.verify().is_empty());

    let entries = h.sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind(), OperationKind::Delete);
    assert_eq!(entries[0].parent, Some(t.group));
}

#[test]
fn test_delete_missing_is_not_found() {
    let h = Harness::new(TreeFixture::new());
    let err = h.engine.delete(&h.ctx, NodeId::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_move_rejects_bad_indexes() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let other = f.child(t.collection, drafts::group("other"));
    let h = Harness::new(f);
    let s = t.samplers[0];

    assert_eq!(
        h.engine.move_node(&h.ctx, s, t.group, -1).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        h.engine.move_node(&h.ctx, s, t.group, 3).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        h.engine.move_node(&h.ctx, s, other, 1).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(child_sorts(&h.engine.snapshot(), t.group), [1, 2, 3]);
    assert!(h.sink.is_empty());
}

#[test]
fn test_move_reparents_across_trees() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let timer = f.child(t.samplers[2], drafts::timer("wait"));
    let c2 = f.root_in(drafts::collection("c2"), "w1");
    let g2 = f.child(c2, drafts::group("g2"));
    let existing = f.child(g2, drafts::http_sampler("x"));
    let h = Harness::new(f);

    h.engine.move_node(&h.ctx, t.samplers[2], g2, 0).unwrap();

    let tables = h.engine.snapshot();
    assert_eq!(child_names(&tables, g2), ["s3", "x"]);
    assert_eq!(tables.child_edge(existing).unwrap().sort, 2);
    assert_eq!(tables.child_edge(t.samplers[2]).unwrap().root, c2);
    assert_eq!(tables.child_edge(timer).unwrap().root, c2);
    assert!(tables.verify().is_empty());

    let entries = h.sink.entries();
    assert_eq!(entries.len(), 1);
    let moved = &entries[0];
    assert_eq!(moved.kind(), OperationKind::Move);
    assert_eq!(moved.root, Some(c2));
    assert_eq!(moved.change.source_no, Some(t.group.to_string()));
    assert_eq!(moved.change.target_index, Some(1));
}

#[test]
fn test_move_into_own_subtree_is_rejected() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    let outer = f.child(g, drafts::loop_controller("outer"));
    let inner = f.child(outer, drafts::loop_controller("inner"));
    let h = Harness::new(f);

    let err = h.engine.move_node(&h.ctx, outer, inner, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_move_checks_placement() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let h = Harness::new(f);
    let err = h
        .engine
        .move_node(&h.ctx, t.samplers[0], t.collection, 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compatibility);
}

#[test]
fn test_duplicate_clones_subtree_with_fresh_ids() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let ctrl = f.child(t.group, drafts::loop_controller("loop"));
    let inner = f.child(ctrl, drafts::http_sampler("inner"));
    f.component(inner, drafts::assertion("check"));
    let h = Harness::with_config(f, EngineConfig::default().with_copy_suffix(" (2)"));

    let clone = h.engine.duplicate(&h.ctx, ctrl).unwrap();

    let tables = h.engine.snapshot();
    assert_ne!(clone, ctrl);
    assert_eq!(child_names(&tables, t.group), ["s1", "s2", "s3", "loop", "loop (2)"]);
    let cloned_inner = tables.children(clone)[0].child;
    assert_ne!(cloned_inner, inner);
    assert_eq!(tables.node(cloned_inner).unwrap().name, "inner");
    assert_eq!(tables.child_edge(cloned_inner).unwrap().root, t.collection);
    assert_eq!(tables.components(cloned_inner).len(), 1);
    assert_eq!(
        tables.read_properties(cloned_inner, true).unwrap(),
        tables.read_properties(inner, true).unwrap()
    );
    assert!(tables.verify().is_empty());

    let entries = h.sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind(), OperationKind::Copy);
    assert_eq!(entries[0].change.source_no, Some(ctrl.to_string()));
}

#[test]
fn test_duplicate_root_config_stands_alone() {
    let mut f = TreeFixture::new();
    let engine_cfg = f.root_in(drafts::database_engine("db", "main"), "w1");
    let h = Harness::new(f);

    let clone = h.engine.duplicate(&h.ctx, engine_cfg).unwrap();

    let tables = h.engine.snapshot();
    assert_eq!(tables.position(clone), Position::Root);
    let node = tables.node(clone).unwrap();
    assert_eq!(node.name, "db copy");
    assert_eq!(node.workspace, Some(WorkspaceId::new("w1")));
    assert_eq!(node.attrs["DatabaseEngine__variable_name"], json!("main"));
}

#[test]
fn test_duplicate_rejects_collections_and_components() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let check = f.component(t.samplers[0], drafts::assertion("check"));
    let h = Harness::new(f);

    for id in [t.collection, check] {
        let err = h.engine.duplicate(&h.ctx, id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn test_paste_copy_appends_clone() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let c2 = f.root_in(drafts::collection("c2"), "w2");
    let g2 = f.child(c2, drafts::group("g2"));
    let h = Harness::new(f);

    let clone = h
        .engine
        .paste(&h.ctx, t.samplers[1], g2, PasteMode::Copy)
        .unwrap()
        .unwrap();

    let tables = h.engine.snapshot();
    assert_eq!(child_names(&tables, t.group), ["s1", "s2", "s3"]);
    assert_eq!(child_names(&tables, g2), ["s2"]);
    assert_eq!(tables.child_edge(clone).unwrap().root, c2);
    assert_eq!(h.kinds(), [OperationKind::Copy]);
}

#[test]
fn test_paste_copy_of_root_level_node_joins_target_tree() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let ctrl = f.root_in(drafts::loop_controller("ctrl"), "w1");
    f.child(ctrl, drafts::http_sampler("inner"));
    f.component(ctrl, drafts::assertion("check"));
    let h = Harness::new(f);

    let clone = h
        .engine
        .paste(&h.ctx, ctrl, t.group, PasteMode::Copy)
        .unwrap()
        .unwrap();

    let tables = h.engine.snapshot();
    assert!(tables.verify().is_empty(), "{:?}", tables.verify());
    assert_eq!(tables.child_edge(clone).unwrap().root, t.collection);
    let inner = tables.children(clone)[0].child;
    assert_eq!(tables.child_edge(inner).unwrap().root, t.collection);
    assert!(tables.components(clone).iter().all(|e| e.root == t.collection));
    assert!(tables.node(clone).unwrap().workspace.is_none());
    assert_eq!(tables.position(ctrl), Position::Root);
}

#[test]
fn test_paste_cut_moves_original() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let g2 = f.child(t.collection, drafts::group("g2"));
    f.child(g2, drafts::http_sampler("x"));
    let h = Harness::new(f);

    let pasted = h
        .engine
        .paste(&h.ctx, t.samplers[0], g2, PasteMode::Cut)
        .unwrap();

    assert!(pasted.is_none());
    let tables = h.engine.snapshot();
    assert_eq!(child_names(&tables, t.group), ["s2", "s3"]);
    assert_eq!(child_names(&tables, g2), ["x", "s1"]);
    assert_eq!(child_sorts(&tables, t.group), [1, 2]);
    assert_eq!(h.kinds(), [OperationKind::Move]);
}

#[test]
fn test_paste_cut_requires_parent_and_no_cycle() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    let outer = f.child(g, drafts::loop_controller("outer"));
    let inner = f.child(outer, drafts::loop_controller("inner"));
    let h = Harness::new(f);

    let err = h
        .engine
        .paste(&h.ctx, outer, inner, PasteMode::Cut)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_state_changes_are_audited_once() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let timer = f.child(t.samplers[0], drafts::timer("wait"));
    let h = Harness::new(f);
    let s = t.samplers[0];

    h.engine.enable(&h.ctx, s).unwrap();
    assert!(h.sink.is_empty());

    h.engine.disable(&h.ctx, s).unwrap();
    assert!(h.engine.snapshot().node(timer).unwrap().enabled);

    h.engine.skip(&h.ctx, s).unwrap();
    h.engine.toggle(&h.ctx, s).unwrap();
    let node = h.engine.snapshot().node(s).unwrap().clone();
    assert!(node.enabled);
    assert!(node.skipped);

    h.engine.enable(&h.ctx, s).unwrap();
    assert!(!h.engine.snapshot().node(s).unwrap().skipped);

    let fields: Vec<(String, Option<String>)> = h
        .sink
        .entries()
        .into_iter()
        .map(|e| (e.change.prop_name.unwrap(), e.change.new_value))
        .collect();
    assert_eq!(
        fields,
        [
            (ENABLED_FIELD.to_string(), Some("false".to_string())),
            (SKIPPED_FIELD.to_string(), Some("true".to_string())),
            (ENABLED_FIELD.to_string(), Some("true".to_string())),
            (SKIPPED_FIELD.to_string(), Some("false".to_string())),
        ]
    );
}

#[test]
fn test_copy_to_workspace_makes_new_tree() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let h = Harness::new(f);
    let target = WorkspaceId::new("w2");

    let clone = h
        .engine
        .copy_to_workspace(&h.ctx, t.collection, &target)
        .unwrap();

    let tables = h.engine.snapshot();
    let node = tables.node(clone).unwrap();
    assert_eq!(node.workspace, Some(target));
    assert_eq!(node.name, "c");
    assert_eq!(tables.position(clone), Position::Root);
    let group = tables.children(clone)[0].child;
    assert_eq!(child_names(&tables, group), ["s1", "s2", "s3"]);
    assert!(tables
        .descendants(clone)
        .iter()
        .all(|&d| tables.root_of(d) == clone));
    assert_eq!(h.kinds(), [OperationKind::Copy]);
}

#[test]
fn test_move_to_workspace_records_transfer() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let h = Harness::new(f);
    let target = WorkspaceId::new("w2");

    h.engine
        .move_to_workspace(&h.ctx, t.collection, &target)
        .unwrap();

    let tables = h.engine.snapshot();
    assert_eq!(tables.node(t.collection).unwrap().workspace, Some(target));
    let entry = &h.sink.entries()[0];
    assert_eq!(entry.kind(), OperationKind::Transfer);
    assert_eq!(entry.change.source_no.as_deref(), Some("w1"));
    assert_eq!(entry.change.target_no.as_deref(), Some("w2"));

    let err = h
        .engine
        .move_to_workspace(&h.ctx, t.group, &WorkspaceId::new("w3"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_move_to_workspace_requires_binding() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("unbound"));
    let h = Harness::new(f);
    let err = h
        .engine
        .move_to_workspace(&h.ctx, c, &WorkspaceId::new("w2"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_failing_sink_never_fails_mutation() {
    let mut f = TreeFixture::new();
    let t = three_samplers(&mut f, "w1");
    let sink = Arc::new(FailingSink::new());
    let engine = MutationEngine::new(Arc::new(f.into_store())).with_audit_sink(sink.clone());
    let ctx = OperationContext::new("bob");

    engine.delete(&ctx, t.samplers[0]).unwrap();

    assert_eq!(sink.attempts(), 1);
    assert_eq!(child_names(&engine.snapshot(), t.group), ["s2", "s3"]);
}

#[test]
fn test_actor_defaults_from_config() {
    let h = Harness::new(TreeFixture::new());
    h.engine
        .create(
            &OperationContext::default(),
            None,
            &NodeDraft::new("cfg", ElementType::Config, "HTTPHeaderTemplate"),
            None,
        )
        .unwrap();
    let entry = &h.sink.entries()[0];
    assert_eq!(entry.operation_by, "system");
    assert!(entry.workspace.is_none());
}

#[test]
fn test_log_ids_share_the_engine_id_sequence() {
    let h = Harness::new(TreeFixture::new());
    let collection = h
        .engine
        .create(&h.ctx, None, &drafts::collection("c"), None)
        .unwrap();
    h.engine
        .create(&h.ctx, Some(collection), &drafts::group("g"), None)
        .unwrap();

    let entries = h.sink.entries();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.log_id.timestamp_ms(), 0);
        assert_ne!(NodeId(entry.log_id), collection);
    }
    assert_ne!(entries[0].log_id, entries[1].log_id);
}

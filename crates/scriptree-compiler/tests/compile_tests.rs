//! End-to-end compile behavior over fixture trees

use pretty_assertions::assert_eq;
use scriptree_compiler::{CompileError, CompileOptions, ElementDocument, ReferenceKind, TreeCompiler};
use scriptree_model::{ElementClass, NodeId};
use scriptree_test_utils::{drafts, TreeFixture};
use serde_json::json;
use std::sync::Arc;

fn compiler(fixture: TreeFixture) -> TreeCompiler {
    TreeCompiler::new(Arc::new(fixture.into_tables()))
}

fn names(doc: &ElementDocument) -> Vec<&str> {
    doc.children.iter().map(|c| c.name.as_str()).collect()
}

fn classes(doc: &ElementDocument) -> Vec<&str> {
    doc.children.iter().map(|c| c.class.as_str()).collect()
}

#[test]
fn disabled_sampler_is_pruned() {
    let mut f = TreeFixture::new();
    let c = f.root_in(drafts::collection("c"), "w1");
    f.child(c, drafts::http_sampler("off").disabled());
    f.child(c, drafts::http_sampler("on"));

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    assert_eq!(names(&doc), ["on"]);
}

#[test]
fn disabled_subtree_is_pruned_entirely() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g").disabled());
    f.child(g, drafts::http_sampler("deep"));
    f.child(c, drafts::group("kept"));

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    assert_eq!(names(&doc), ["kept"]);
    assert!(doc.find_class("HTTPSampler").is_none());
}

#[test]
fn properties_are_materialized() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(
        g,
        drafts::http_sampler("s").with_prop("HTTPSampler__params", json!([{"k": "v"}])),
    );

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    let sampler = &doc.children[0].children[0];
    assert_eq!(sampler.properties["HTTPSampler__method"], json!("GET"));
    assert_eq!(sampler.properties["HTTPSampler__params"], json!([{"k": "v"}]));
}

#[test]
fn shared_engine_is_hoisted_once() {
    let mut f = TreeFixture::new();
    let engine = f.root_in(drafts::database_engine("orders db", "orders"), "w1");
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(g, drafts::sql_sampler("q1", engine));
    f.child(g, drafts::sql_sampler("q2", engine));

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    assert_eq!(classes(&doc), ["DatabaseEngine", "TestGroup"]);
    let hoisted = &doc.children[0];
    assert_eq!(hoisted.property_str("DatabaseEngine__variable_name"), Some("orders"));
    assert_eq!(hoisted.property_str("DatabaseEngine__port"), Some("5432"));

    for sampler in &doc.children[1].children {
        assert_eq!(sampler.property_str("SQLSampler__engine_name"), Some("orders"));
        assert!(!sampler.properties.contains_key("engineNo"));
    }
}

#[test]
fn missing_engine_aborts() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    let q = f.child(g, drafts::sql_sampler("q", NodeId::new()));

    let err = compiler(f).compile(c, &CompileOptions::new()).unwrap_err();
    match err {
        CompileError::MissingReference { kind, referrer, .. } => {
            assert_eq!(kind, ReferenceKind::DatabaseEngine);
            assert_eq!(referrer, q);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn header_templates_become_leading_manager() {
    let mut f = TreeFixture::new();
    let template = f.root_in(drafts::header_template("json"), "w1");
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    let s = f.child(
        g,
        drafts::http_sampler("s").with_attr(
            "HTTPSampler__header_templates",
            json!([template.to_string(), NodeId::new().to_string()]),
        ),
    );
    f.component(s, drafts::post_processor("extract"));

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    let sampler = &doc.children[0].children[0];
    assert_eq!(classes(sampler), ["HTTPHeaderManager", "JsonPathExtractor"]);
    let headers = &sampler.children[0].properties["HeaderManager__headers"];
    assert_eq!(
        headers,
        &json!([{
            "class": "HTTPHeader",
            "property": {"Header__name": "Accept", "Header__value": "application/json"}
        }])
    );
}

#[test]
fn built_ins_wrap_group_children() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(g, drafts::http_sampler("s"));
    f.component(g, drafts::pre_processor("pre"));
    f.component(g, drafts::assertion("a1"));
    f.component(g, drafts::assertion("a2"));
    f.component(g, drafts::assertion("off").disabled());

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    assert_eq!(names(&doc.children[0]), ["a2", "a1", "s", "pre"]);
}

#[test]
fn sampler_assertions_run_before_its_children_last_attached_first() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    let s = f.child(g, drafts::http_sampler("s"));
    f.component(s, drafts::assertion("status"));
    f.component(s, drafts::post_processor("extract"));
    f.component(s, drafts::assertion("body"));

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    assert_eq!(names(&doc.children[0].children[0]), ["body", "status", "extract"]);
}

#[test]
fn controller_components_are_not_built_in() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    let l = f.child(g, drafts::loop_controller("loop"));
    f.component(l, drafts::assertion("a"));

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    assert!(doc.children[0].children[0].children.is_empty());
}

struct Scoped {
    compiler: TreeCompiler,
    collection: NodeId,
    main: NodeId,
    samplers: [NodeId; 3],
}

fn scoped() -> Scoped {
    let mut f = TreeFixture::new();
    let collection = f.root(drafts::collection("c"));
    f.child(collection, drafts::setup_group("setup"));
    let main = f.child(collection, drafts::group("main"));
    f.child(collection, drafts::group("other"));
    f.child(collection, drafts::teardown_group("teardown"));
    let samplers = ["s1", "s2", "s3"].map(|n| f.child(main, drafts::http_sampler(n)));
    Scoped {
        compiler: compiler(f),
        collection,
        main,
        samplers,
    }
}

#[test]
fn group_scope_keeps_scaffolding() {
    let s = scoped();
    let doc = s
        .compiler
        .compile(s.collection, &CompileOptions::new().for_group(s.main))
        .unwrap();
    assert_eq!(names(&doc), ["setup", "main", "teardown"]);

    let doc = s
        .compiler
        .compile(s.collection, &CompileOptions::new().for_group(s.main).self_only())
        .unwrap();
    assert_eq!(names(&doc), ["main"]);
}

#[test]
fn scaffolding_and_samplers_can_be_suppressed() {
    let s = scoped();
    let doc = s
        .compiler
        .compile(s.collection, &CompileOptions::new().without_scaffolding())
        .unwrap();
    assert_eq!(names(&doc), ["main", "other"]);

    let doc = s
        .compiler
        .compile(s.collection, &CompileOptions::new().without_samplers())
        .unwrap();
    assert!(doc.find_class("HTTPSampler").is_none());
    assert_eq!(doc.children.len(), 4);
}

#[test]
fn sampler_scope_prunes_later_samplers() {
    let s = scoped();
    let doc = s
        .compiler
        .compile(s.collection, &CompileOptions::new().for_sampler(s.samplers[1]))
        .unwrap();
    assert_eq!(names(&doc.children[1]), ["s1", "s2"]);
}

#[test]
fn sampler_scope_self_only_keeps_one() {
    let s = scoped();
    let doc = s
        .compiler
        .compile(
            s.collection,
            &CompileOptions::new().for_sampler(s.samplers[1]).self_only(),
        )
        .unwrap();
    assert_eq!(names(&doc.children[1]), ["s2"]);
}

#[test]
fn snippet_reference_expands_with_bound_parameters() {
    let mut f = TreeFixture::new();
    let snippet = f.root_in(
        drafts::snippets("login")
            .with_prop("useHTTPSession", "true")
            .with_prop(
                "parameters",
                json!([{"name": "user", "default": "guest"}, {"name": "pwd", "default": "secret"}]),
            ),
        "w1",
    );
    f.child(snippet, drafts::http_sampler("post-login"));
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(
        g,
        drafts::snippet_sampler("use login", snippet)
            .with_prop("arguments", json!([{"name": "user", "value": "bob"}])),
    );

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    let reference = &doc.children[0].children[0];
    assert_eq!(reference.class, ElementClass::TransactionController);
    assert_eq!(reference.name, "use login");
    assert!(reference.properties.is_empty());
    assert_eq!(
        classes(reference),
        ["TransactionParameter", "TransactionHTTPSessionManager", "HTTPSampler"]
    );
    assert_eq!(
        reference.children[0].properties["Arguments__arguments"],
        json!([
            {"class": "Argument", "property": {"Argument__name": "user", "Argument__value": "bob"}},
            {"class": "Argument", "property": {"Argument__name": "pwd", "Argument__value": "secret"}},
        ])
    );
}

#[test]
fn snippet_contents_ignore_sampler_scope() {
    let mut f = TreeFixture::new();
    let snippet = f.root(drafts::snippets("s"));
    f.child(snippet, drafts::http_sampler("inner1"));
    f.child(snippet, drafts::http_sampler("inner2"));
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(g, drafts::http_sampler("before"));
    let reference = f.child(g, drafts::snippet_sampler("ref", snippet));

    let doc = compiler(f)
        .compile(c, &CompileOptions::new().for_sampler(reference).self_only())
        .unwrap();
    let group = &doc.children[0];
    assert_eq!(names(group), ["ref"]);
    assert_eq!(names(&group.children[0]), ["inner1", "inner2"]);
}

#[test]
fn unset_snippet_reference_aborts() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(
        g,
        scriptree_model::NodeDraft::new("r", scriptree_model::ElementType::Sampler, "SnippetSampler"),
    );

    let err = compiler(f).compile(c, &CompileOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::MissingReference { kind: ReferenceKind::Snippet, ref reference, .. } if reference == "<unset>"
    ));
}

#[test]
fn reference_to_non_snippet_aborts() {
    let mut f = TreeFixture::new();
    let other = f.root(drafts::collection("not a snippet"));
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(g, drafts::snippet_sampler("r", other));

    let err = compiler(f).compile(c, &CompileOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::MissingReference { kind: ReferenceKind::Snippet, .. }
    ));
}

#[test]
fn self_referencing_snippet_is_rejected() {
    let mut f = TreeFixture::new();
    let snippet = f.root(drafts::snippets("loop"));
    f.child(snippet, drafts::snippet_sampler("again", snippet));
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(g, drafts::snippet_sampler("r", snippet));
    let compiler = compiler(f);

    let err = compiler.compile(c, &CompileOptions::new()).unwrap_err();
    assert!(matches!(err, CompileError::CyclicSnippet(id) if id == snippet));
    assert!(matches!(
        compiler.compile_snippet(snippet),
        Err(CompileError::CyclicSnippet(_))
    ));
}

#[test]
fn same_snippet_twice_is_not_a_cycle() {
    let mut f = TreeFixture::new();
    let snippet = f.root(drafts::snippets("s"));
    f.child(snippet, drafts::http_sampler("inner"));
    let c = f.root(drafts::collection("c"));
    let g = f.child(c, drafts::group("g"));
    f.child(g, drafts::snippet_sampler("r1", snippet));
    f.child(g, drafts::snippet_sampler("r2", snippet));

    let doc = compiler(f).compile(c, &CompileOptions::new()).unwrap();
    assert_eq!(doc.children[0].children.len(), 2);
}

#[test]
fn standalone_snippet_is_wrapped() {
    let mut f = TreeFixture::new();
    let engine = f.root(drafts::database_engine("db", "main_db"));
    let snippet = f.root(drafts::snippets("login").with_prop("useHTTPSession", "true"));
    f.child(snippet, drafts::http_sampler("a"));
    f.child(snippet, drafts::sql_sampler("q", engine));

    let doc = compiler(f).compile_snippet(snippet).unwrap();
    assert_eq!(doc.class, ElementClass::TestCollection);
    assert_eq!(doc.name, "login");
    assert_eq!(classes(&doc), ["DatabaseEngine", "TestGroup"]);
    assert_eq!(
        classes(&doc.children[1]),
        ["HTTPSessionManager", "HTTPSampler", "SQLSampler"]
    );
}

#[test]
fn compile_snippet_requires_snippet() {
    let mut f = TreeFixture::new();
    let c = f.root(drafts::collection("c"));
    let err = compiler(f).compile_snippet(c).unwrap_err();
    assert!(matches!(err, CompileError::NotFound { what: "snippet collection", .. }));
}

#[test]
fn missing_or_pruned_root() {
    let mut f = TreeFixture::new();
    let off = f.root(drafts::collection("off").disabled());
    let compiler = compiler(f);

    assert!(matches!(
        compiler.compile(NodeId::new(), &CompileOptions::new()),
        Err(CompileError::NotFound { what: "element", .. })
    ));
    assert!(matches!(
        compiler.compile(off, &CompileOptions::new()),
        Err(CompileError::EmptyScript(id)) if id == off
    ));
}

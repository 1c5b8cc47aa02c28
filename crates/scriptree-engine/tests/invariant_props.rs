//! Sibling density and root propagation under random edit sequences

use proptest::prelude::*;
use scriptree_engine::{MutationEngine, OperationContext, PasteMode};
use scriptree_model::{NodeId, Position};
use scriptree_store::Tables;
use scriptree_test_utils::{drafts, TreeFixture};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Move(usize, usize, i64),
    Delete(usize),
    Duplicate(usize),
    Paste(usize, usize, bool),
    Create(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..64usize, 0..64usize, -1..6i64).prop_map(|(s, t, i)| Op::Move(s, t, i)),
        1 => (0..64usize).prop_map(Op::Delete),
        1 => (0..64usize).prop_map(Op::Duplicate),
        2 => (0..64usize, 0..64usize, any::<bool>()).prop_map(|(s, t, c)| Op::Paste(s, t, c)),
        1 => (0..64usize).prop_map(Op::Create),
    ]
}

fn fixture() -> TreeFixture {
    let mut f = TreeFixture::new();
    for tree in ["c1", "c2"] {
        let c = f.root_in(drafts::collection(tree), "w1");
        for g in 0..2 {
            let group = f.child(c, drafts::group(&format!("{tree}-g{g}")));
            for s in 0..3 {
                let sampler = f.child(group, drafts::http_sampler(&format!("{tree}-g{g}-s{s}")));
                if s == 0 {
                    f.component(sampler, drafts::assertion("check"));
                }
            }
            let ctrl = f.child(group, drafts::loop_controller(&format!("{tree}-g{g}-loop")));
            f.child(ctrl, drafts::timer("wait"));
        }
    }
    let loose = f.root_in(drafts::loop_controller("loose-loop"), "w1");
    f.child(loose, drafts::http_sampler("loose-s"));
    f.component(loose, drafts::assertion("loose-check"));
    f.root_in(drafts::header_template("headers"), "w1");
    f
}

fn engine() -> MutationEngine {
    let f = fixture();
    let ids = f.ids();
    MutationEngine::new(Arc::new(f.into_store())).with_id_generator(ids)
}

fn pick(ids: &[NodeId], i: usize) -> Option<NodeId> {
    (!ids.is_empty()).then(|| ids[i % ids.len()])
}

fn pools(tables: &Tables) -> (Vec<NodeId>, Vec<NodeId>) {
    let mut children: Vec<NodeId> = tables
        .nodes()
        .filter(|n| matches!(tables.position(n.id), Position::Child(_)))
        .map(|n| n.id)
        .collect();
    let mut all: Vec<NodeId> = tables.nodes().map(|n| n.id).collect();
    children.sort();
    all.sort();
    (children, all)
}

fn apply(engine: &MutationEngine, op: &Op) {
    let ctx = OperationContext::new("prop");
    let (_, all) = pools(&engine.snapshot());
    // rejected operations are fine; only committed state is checked
    let _ = match *op {
        Op::Move(s, t, i) => match (pick(&all, s), pick(&all, t)) {
            (Some(s), Some(t)) => engine.move_node(&ctx, s, t, i).map(|_| ()),
            _ => Ok(()),
        },
        Op::Delete(s) => pick(&all, s).map_or(Ok(()), |s| engine.delete(&ctx, s)),
        Op::Duplicate(s) => {
            pick(&all, s).map_or(Ok(()), |s| engine.duplicate(&ctx, s).map(|_| ()))
        }
        Op::Paste(s, t, copy) => match (pick(&all, s), pick(&all, t)) {
            (Some(s), Some(t)) => {
                let mode = if copy { PasteMode::Copy } else { PasteMode::Cut };
                engine.paste(&ctx, s, t, mode).map(|_| ())
            }
            _ => Ok(()),
        },
        Op::Create(p) => pick(&all, p).map_or(Ok(()), |p| {
            engine
                .create(&ctx, Some(p), &drafts::python_sampler("new"), None)
                .map(|_| ())
        }),
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_edits_keep_tables_consistent(ops in proptest::collection::vec(op(), 1..40)) {
        let engine = engine();
        for op in &ops {
            apply(&engine, op);
            let violations = engine.snapshot().verify();
            prop_assert!(violations.is_empty(), "{:?} after {:?}", violations, op);
        }
    }

    #[test]
    fn prop_failed_edits_change_nothing(s in 0..64usize, t in 0..64usize, i in 6..20i64) {
        let engine = engine();
        let before = engine.snapshot().to_snapshot();
        let (children, all) = pools(&engine.snapshot());
        let (s, t) = (children[s % children.len()], all[t % all.len()]);
        prop_assert!(engine.move_node(&OperationContext::default(), s, t, i).is_err());
        let after = engine.snapshot().to_snapshot();
        prop_assert_eq!(before, after);
    }
}

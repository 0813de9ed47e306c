// tests/property/registry_test.rs

//! Property-based tests for the presence registry
//!
//! Random sequences of joins, renames and leaves must keep the registry
//! consistent: one entry per identity, and every key equal to the identity of
//! the session it maps to.

use crate::test_helpers::TestContext;
use proptest::prelude::*;
use relaychat::connection::Session;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Join(u8),
    Rename(usize, u8),
    Leave(usize),
}

fn name(n: u8) -> String {
    format!("user{n}")
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Join),
        (any::<usize>(), 0u8..8).prop_map(|(i, n)| Op::Rename(i, n)),
        any::<usize>().prop_map(Op::Leave),
    ]
}

fn assert_consistent(ctx: &TestContext, model: &HashMap<String, u64>) {
    let registry = &ctx.state.registry;
    assert_eq!(registry.len(), model.len());
    for identity in registry.snapshot() {
        let session = registry.lookup(&identity).unwrap();
        assert_eq!(session.identity(), identity);
        assert_eq!(model.get(&identity), Some(&session.id()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_registry_stays_consistent(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ctx = TestContext::new();
        let mut live: Vec<Arc<Session>> = Vec::new();
        let mut model: HashMap<String, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Join(n) => {
                    let (session, _rx) = ctx.new_session();
                    let identity = name(n);
                    let result = ctx.state.registry.insert(&identity, session.clone());
                    prop_assert_eq!(result.is_ok(), !model.contains_key(&identity));
                    if result.is_ok() {
                        model.insert(identity, session.id());
                        live.push(session);
                    }
                }
                Op::Rename(i, n) if !live.is_empty() => {
                    let session = &live[i % live.len()];
                    let old = session.identity();
                    let new = name(n);
                    let result = ctx.state.registry.rename(session, &new);
                    if model.contains_key(&new) {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(session.identity(), old);
                    } else {
                        prop_assert_eq!(result.unwrap(), old.clone());
                        let id = model.remove(&old).unwrap();
                        model.insert(new, id);
                    }
                }
                Op::Leave(i) if !live.is_empty() => {
                    let session = live.swap_remove(i % live.len());
                    let identity = session.identity();
                    let removed = ctx.state.registry.remove_session(&session);
                    prop_assert_eq!(removed, Some(identity.clone()));
                    model.remove(&identity);
                }
                _ => {}
            }
            assert_consistent(&ctx, &model);
        }
    }

    #[test]
    fn prop_snapshot_is_sorted_and_unique(names in prop::collection::vec("[a-z]{1,6}", 0..20)) {
        let mut ctx = TestContext::new();
        let mut sessions = Vec::new();
        for n in &names {
            let (session, _rx) = ctx.new_session();
            let _ = ctx.state.registry.insert(n, session.clone());
            sessions.push(session);
        }
        let snapshot = ctx.state.registry.snapshot();
        let mut expected: Vec<String> = names.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(snapshot, expected);
    }
}

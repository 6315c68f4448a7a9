//! Property: whatever sequence of lifecycle calls is made, an intent never
//! reaches EXECUTED without an approved event in its history, and terminal
//! statuses never move again.

use proptest::prelude::*;
use spine_intent::{IntentStatus, IntentStore, StageRequest};
use spine_tests::*;
use spine_types::Lane;

#[derive(Clone, Copy, Debug)]
enum Op {
    Submit,
    Approve,
    Reject,
    Defer,
    Cancel,
    Execute,
    Expire,
    Force(IntentStatus),
}

fn ops() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Submit),
        Just(Op::Approve),
        Just(Op::Reject),
        Just(Op::Defer),
        Just(Op::Cancel),
        Just(Op::Execute),
        Just(Op::Expire),
        prop::sample::select(IntentStatus::ALL.to_vec()).prop_map(Op::Force),
    ]
}

fn later() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now() + chrono::Duration::hours(1)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn executed_implies_approved_event(seq in prop::collection::vec(ops(), 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = Harness::new();
            let intent = h
                .lifecycle
                .stage(
                    StageRequest::new("create_proposition", Lane::Grounded, proposition_payload())
                        .with_scope_lock(SCOPE),
                )
                .await
                .unwrap();
            let id = intent.intent_id;

            for op in seq {
                let before = h.lifecycle.get(&id).await.unwrap().status;
                let _ = match op {
                    Op::Submit => h.lifecycle.submit_for_review(&id, "orchestrator").await.map(|_| ()),
                    Op::Approve => h.lifecycle.approve(&id, "reviewer", "ok").await.map(|_| ()),
                    Op::Reject => h.lifecycle.reject(&id, "reviewer", "no").await.map(|_| ()),
                    Op::Defer => h.lifecycle.defer(&id, "reviewer", later(), "later").await.map(|_| ()),
                    Op::Cancel => h.lifecycle.cancel(&id, "orchestrator", "withdrawn").await.map(|_| ()),
                    Op::Execute => h.lifecycle.execute(&id, "exec-p").await.map(|_| ()),
                    Op::Expire => h.lifecycle.expire(&id).await.map(|_| ()),
                    Op::Force(to) => {
                        // Raw status writes bypass the event log entirely.
                        let _ = h.store.update_status(&id, before, to).await;
                        Ok(())
                    }
                };

                let after = h.lifecycle.get(&id).await.unwrap().status;
                if before.is_terminal() && !matches!(op, Op::Force(_)) {
                    assert_eq!(after, before, "terminal {before} moved via {op:?}");
                }
                let history = h.lifecycle.history(&id).await.unwrap();
                if history.iter().any(|e| e.to_status == IntentStatus::Executed) {
                    assert!(
                        history.iter().any(|e| e.to_status == IntentStatus::Approved),
                        "executed without approval after {op:?}"
                    );
                }
            }
        });
    }
}

#[test]
fn terminal_statuses_have_no_edges() {
    for status in IntentStatus::ALL {
        if status.is_terminal() {
            for to in IntentStatus::ALL {
                assert!(!status.can_transition_to(to), "{status} -> {to}");
            }
        }
    }
    assert!(IntentStatus::Executed.is_terminal());
    assert!(IntentStatus::Rejected.is_terminal());
}

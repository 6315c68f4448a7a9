//! Adversarial: a status forced to APPROVED without an approval event never
//! executes, alone or in a batch.

use spine_intent::{IntentStatus, IntentStore, LifecycleError, StageRequest, TransitionDenial};
use spine_tests::*;
use spine_types::Lane;

async fn forced(h: &Harness) -> spine_types::IntentId {
    let intent = h
        .lifecycle
        .stage(StageRequest::new("create_proposition", Lane::Grounded, proposition_payload()).with_scope_lock(SCOPE))
        .await
        .unwrap();
    h.store
        .update_status(&intent.intent_id, IntentStatus::Staged, IntentStatus::Approved)
        .await
        .unwrap();
    intent.intent_id
}

#[tokio::test]
async fn execute_refuses_without_approved_event() {
    let h = Harness::new();
    let id = forced(&h).await;

    let err = h.lifecycle.execute(&id, "exec-1").await.unwrap_err();
    match err {
        LifecycleError::Transition(e) => assert_eq!(e.reason, TransitionDenial::MissingApproval),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.lifecycle.get(&id).await.unwrap().status, IntentStatus::Approved);
    assert!(h.lifecycle.history(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn forced_member_blocks_the_whole_batch() {
    let h = Harness::new();
    let honest = h.approved_proposition(SCOPE).await.unwrap();
    let forged = forced(&h).await;

    assert!(h
        .lifecycle
        .execute_batch(&[honest.clone(), forged], "exec-2")
        .await
        .is_err());
    assert_eq!(h.lifecycle.get(&honest).await.unwrap().status, IntentStatus::Approved);
}

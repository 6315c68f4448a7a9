//! Scenario: a batch spanning two scope locks holds every member.

use spine_intent::IntentStatus;
use spine_tests::Harness;

#[tokio::test]
async fn heterogeneous_batch_defers_all_members() {
    let h = Harness::new();
    let i1 = h.approved_proposition("A").await.unwrap();
    let i2 = h.approved_proposition("B").await.unwrap();

    let outcome = h
        .lifecycle
        .execute_batch(&[i1.clone(), i2.clone()], "exec-1")
        .await
        .unwrap();
    assert!(outcome.executed.is_empty());
    assert_eq!(outcome.held, vec![i1.clone(), i2.clone()]);

    for id in [&i1, &i2] {
        let intent = h.lifecycle.get(id).await.unwrap();
        assert_eq!(intent.status, IntentStatus::Deferred);
        let events = h.lifecycle.history(id).await.unwrap();
        let hold = events.last().unwrap();
        assert_eq!(hold.from_status, IntentStatus::Approved);
        assert_eq!(hold.to_status, IntentStatus::Deferred);
        assert!(hold.rationale.as_deref().unwrap_or_default().contains("HOLD"));
        assert_eq!(hold.execution_id.as_deref(), Some("exec-1"));
    }
}

#[tokio::test]
async fn homogeneous_batch_executes_all_members() {
    let h = Harness::new();
    let i1 = h.approved_proposition("A").await.unwrap();
    let i2 = h.approved_proposition("A").await.unwrap();

    let outcome = h
        .lifecycle
        .execute_batch(&[i1.clone(), i2.clone()], "exec-2")
        .await
        .unwrap();
    assert_eq!(outcome.executed, vec![i1.clone(), i2.clone()]);
    assert!(outcome.held.is_empty());
    for id in [&i1, &i2] {
        assert_eq!(h.lifecycle.get(id).await.unwrap().status, IntentStatus::Executed);
    }
}

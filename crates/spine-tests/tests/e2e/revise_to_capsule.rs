//! Scenario: consistent support evidence flows from theory decision through
//! staging, the gate, sealing, and replay.

use std::sync::Arc;

use spine_governance::{GateInput, GateStatus};
use spine_intent::IntentStatus;
use spine_replay::{CapsuleReplayVerifier, ReplayStatus, RunCapsule};
use spine_tests::*;
use spine_theory::{TheoryAction, TheoryOperator};
use spine_types::{Lane, ScopeLockId};

#[tokio::test]
async fn two_supports_revise_stage_and_replay() {
    let h = Harness::new();
    let evidence = support_evidence().unwrap();

    let proposal = TheoryOperator::default()
        .generate_proposal(SESSION, CLAIM, &evidence)
        .unwrap();
    assert_eq!(proposal.action, TheoryAction::Revise);

    let intent = h
        .lifecycle
        .stage(proposal.stage_request(Lane::Grounded, Some(ScopeLockId::from(SCOPE))))
        .await
        .unwrap();
    assert_eq!(intent.status, IntentStatus::Approved);
    assert_eq!(intent.proposal_id.as_ref(), Some(proposal.proposal_id()));

    let input = GateInput::new(SESSION)
        .with_lane(Lane::Grounded)
        .with_evidence(["ev-2", "ev-1"])
        .with_intent(intent.intent_id.clone(), Some(proposal.proposal_id().clone()))
        .with_scope_lock(SCOPE);
    let summary = h.gate.evaluate(&input).await;
    assert_eq!(summary.status, GateStatus::Staged, "{:?}", summary.hold_reason);

    let capsule = RunCapsule::seal(&summary, "qh-1", Some("tenant-a")).unwrap();
    let verifier = CapsuleReplayVerifier::new(Arc::new(ledger_for(&capsule)));
    let verdict = verifier.verify(&capsule, Some("tenant-a")).await;
    assert_eq!(verdict.status, ReplayStatus::Pass, "{:?}", verdict.reasons);
}

#[tokio::test]
async fn gate_reads_the_stored_intent_not_the_callers_copy() {
    let h = Harness::new();
    let proposal = TheoryOperator::default()
        .generate_proposal(SESSION, CLAIM, &support_evidence().unwrap())
        .unwrap();
    let intent = h
        .lifecycle
        .stage(proposal.stage_request(Lane::Grounded, None))
        .await
        .unwrap();

    // A caller-side copy claiming different evidence changes nothing: the
    // gate compares persisted ids with what the store holds.
    let mut forged = intent.clone();
    forged
        .payload
        .insert("evidence_ids".into(), serde_json::json!(["ev-9"]));

    let input = GateInput::new(SESSION)
        .with_evidence(["ev-9"])
        .with_intent(forged.intent_id.clone(), forged.proposal_id.clone());
    let summary = h.gate.evaluate(&input).await;
    assert_eq!(summary.hold_code, Some(spine_governance::HoldCode::EvidenceSetMismatch));
}

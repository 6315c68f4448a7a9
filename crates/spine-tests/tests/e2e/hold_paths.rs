//! Scenarios where the session must stop in HOLD.

use spine_governance::{GateInput, GateStatus, HoldCode};
use spine_replay::RunCapsule;
use spine_tests::*;
use spine_theory::{TheoryAction, TheoryOperator};
use spine_types::Lane;

#[tokio::test]
async fn nothing_persisted_holds() {
    let h = Harness::new();
    let summary = h.gate.evaluate(&GateInput::new(SESSION).with_evidence(Vec::<String>::new())).await;
    assert_eq!(summary.status, GateStatus::Hold);
    assert_eq!(summary.hold_code, Some(HoldCode::NoEvidencePersisted));
    assert_eq!(summary.gate_code, "NO_EVIDENCE_PERSISTED");

    // A HOLD verdict cannot be sealed into a capsule.
    assert!(RunCapsule::seal(&summary, "qh", None).is_err());
}

#[tokio::test]
async fn single_row_is_a_theory_hold_not_an_error() {
    let h = Harness::new();
    let evidence = support_evidence().unwrap();
    let proposal = TheoryOperator::default()
        .generate_proposal(SESSION, CLAIM, &evidence[..1])
        .unwrap();
    assert_eq!(proposal.action, TheoryAction::Hold);

    // Staging still records the proposal; the decision is data.
    let intent = h
        .lifecycle
        .stage(proposal.stage_request(Lane::Grounded, None))
        .await
        .unwrap();
    assert_eq!(intent.payload["action"], "hold");
}

#[tokio::test]
async fn proposal_error_wins_over_every_other_check() {
    let h = Harness::new();
    let input = GateInput::new(SESSION).with_proposal_error("operator failed");
    let summary = h.gate.evaluate(&input).await;
    assert_eq!(summary.hold_code, Some(HoldCode::ProposalGenerationError));
    assert_eq!(summary.failure_reason.as_deref(), Some("operator failed"));
}

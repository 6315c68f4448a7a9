//! Adversarial: edits to a sealed capsule are caught on replay.

use std::sync::Arc;

use serde_json::json;
use spine_governance::GovernanceSummary;
use spine_replay::{CapsuleReplayVerifier, ReplayCode, RunCapsule};
use spine_tests::*;

fn sealed() -> RunCapsule {
    let summary: GovernanceSummary = serde_json::from_value(json!({
        "contract_version": "v1",
        "status": "STAGED",
        "lane": "grounded",
        "session_id": SESSION,
        "persisted_evidence_ids": ["ev-1", "ev-2"],
        "intent_id": "intent_abc",
        "proposal_id": "prop-abc",
        "mutation_ids": ["mut-1"],
        "scope_lock_id": SCOPE,
        "hold_code": null,
        "hold_reason": null,
        "gate_code": "PASS",
        "failure_reason": null,
        "duration_ms": 3
    }))
    .unwrap();
    RunCapsule::seal(&summary, "qh", None).unwrap()
}

#[tokio::test]
async fn injected_evidence_breaks_hash_and_primacy() {
    let original = sealed();
    let ledger = ledger_for(&original);

    let mut tampered = original.clone();
    tampered.evidence_ids.push("ev-fake999".into());

    let verdict = CapsuleReplayVerifier::new(Arc::new(ledger))
        .verify(&tampered, None)
        .await;
    assert!(!verdict.passed());
    assert_eq!(
        verdict.codes,
        vec![ReplayCode::HashMismatch, ReplayCode::EvidenceMissingFromLedger]
    );
    assert_eq!(verdict.details.primacy.missing, vec!["ev-fake999".to_string()]);
}

#[tokio::test]
async fn injected_mutation_fails_linkage() {
    let original = sealed();
    let ledger = ledger_for(&original);

    let mut tampered = original.clone();
    tampered.mutation_ids = Some(vec!["mut-1".into(), "mut-forged".into()]);
    tampered.capsule_hash = tampered.compute_hash(&tampered.capsule_id);

    let verdict = CapsuleReplayVerifier::new(Arc::new(ledger))
        .verify(&tampered, None)
        .await;
    assert_eq!(verdict.codes, vec![ReplayCode::MutationLinkageMissing]);
    assert_eq!(verdict.details.mutation_linkage.missing, vec!["mut-forged".to_string()]);
}

#[tokio::test]
async fn stripping_tenant_does_not_evade_scope_check() {
    let original = sealed();
    let ledger = ledger_for(&original);
    let verdict = CapsuleReplayVerifier::new(Arc::new(ledger))
        .verify(&original, Some("tenant-a"))
        .await;
    assert_eq!(verdict.codes, vec![ReplayCode::TenantScopeMissing]);
}

//! Property: a coherent session stages regardless of evidence order, and
//! breaking exactly one coherence check yields exactly that check's code.

use proptest::prelude::*;
use serde_json::json;
use spine_governance::{GateInput, GateStatus, GovernanceSummary, HoldCode};
use spine_intent::StageRequest;
use spine_tests::*;
use spine_types::{Lane, ProposalId};

#[derive(Clone, Copy, Debug)]
enum Break {
    None,
    DropPersisted,
    ExtraPersisted,
    WrongProposal,
    WrongScope,
}

fn breaks() -> impl Strategy<Value = Break> {
    prop_oneof![
        Just(Break::None),
        Just(Break::DropPersisted),
        Just(Break::ExtraPersisted),
        Just(Break::WrongProposal),
        Just(Break::WrongScope),
    ]
}

fn evaluate(ids: Vec<String>, rotate: usize, brk: Break) -> GovernanceSummary {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let h = Harness::new();
        let payload = object(json!({
            "action": "revise",
            "claim_id": CLAIM,
            "evidence_ids": ids,
            "conflict_score": 0.0,
            "rationale": "supported"
        }));
        let intent = h
            .lifecycle
            .stage(
                StageRequest::new("stage_epistemic_proposal", Lane::Grounded, payload)
                    .with_scope_lock(SCOPE)
                    .with_proposal("prop-1"),
            )
            .await
            .unwrap();

        let mut persisted = ids.clone();
        let len = persisted.len();
        persisted.rotate_left(rotate % len);
        let mut proposal = Some(ProposalId::from("prop-1"));
        let mut scope = SCOPE;
        match brk {
            Break::None => {}
            Break::DropPersisted => {
                persisted.pop();
            }
            Break::ExtraPersisted => persisted.push("ev-extra".into()),
            Break::WrongProposal => proposal = Some(ProposalId::from("prop-2")),
            Break::WrongScope => scope = "sl-other",
        }

        let input = GateInput::new(SESSION)
            .with_lane(Lane::Grounded)
            .with_evidence(persisted)
            .with_intent(intent.intent_id, proposal)
            .with_scope_lock(scope);
        h.gate.evaluate(&input).await
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn single_break_yields_its_code(
        ids in prop::collection::btree_set("ev-[a-f0-9]{6}", 2..6),
        rotate in 0usize..8,
        brk in breaks(),
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let summary = evaluate(ids, rotate, brk);

        let expected = match brk {
            Break::None => None,
            Break::DropPersisted | Break::ExtraPersisted => Some(HoldCode::EvidenceSetMismatch),
            Break::WrongProposal => Some(HoldCode::IntentProposalMismatch),
            Break::WrongScope => Some(HoldCode::ScopeLockMismatch),
        };
        prop_assert_eq!(summary.hold_code, expected);
        match expected {
            None => {
                prop_assert_eq!(summary.status, GateStatus::Staged);
                prop_assert_eq!(summary.gate_code.as_str(), "PASS");
            }
            Some(code) => {
                prop_assert_eq!(summary.status, GateStatus::Hold);
                prop_assert_eq!(summary.gate_code.as_str(), code.as_str());
            }
        }
    }
}

use proptest::prelude::*;
use spine_theory::{
    aggregate_evidence, compute_conflict_score, compute_entropy_proxy,
    compute_theory_change_action, ClassifiedEvidence, EvidenceRow, TheoryAction,
};
use spine_types::{EvidenceChannel, EvidenceRole};

fn role() -> impl Strategy<Value = EvidenceRole> {
    prop_oneof![
        Just(EvidenceRole::Support),
        Just(EvidenceRole::Refute),
        Just(EvidenceRole::Undercut),
        Just(EvidenceRole::Replicate),
    ]
}

fn channel() -> impl Strategy<Value = EvidenceChannel> {
    prop_oneof![Just(EvidenceChannel::Validation), Just(EvidenceChannel::Negative)]
}

fn evidence() -> impl Strategy<Value = ClassifiedEvidence> {
    (role(), channel(), 0.0f64..=1.0).prop_map(|(role, channel, confidence)| {
        ClassifiedEvidence::new(
            EvidenceRow {
                evidence_id: None,
                claim_id: None,
                scope_lock_id: None,
                confidence,
                role: Some(role),
                failure_mode: None,
            },
            role,
            channel,
        )
    })
}

proptest! {
    #[test]
    fn below_minimum_is_always_hold(ev in prop::collection::vec(evidence(), 0..2)) {
        let d = compute_theory_change_action("c1", &ev);
        prop_assert_eq!(d.action, TheoryAction::Hold);
    }

    #[test]
    fn scores_stay_in_unit_interval(ev in prop::collection::vec(evidence(), 0..40)) {
        let agg = aggregate_evidence("c1", &ev);
        let c = compute_conflict_score(&agg);
        let e = compute_entropy_proxy(&agg);
        prop_assert!((0.0..=1.0).contains(&c));
        prop_assert!((0.0..=1.0).contains(&e));
    }

    #[test]
    fn equal_support_and_refute_forks(n in 1usize..10, conf in 0.05f64..=1.0) {
        let mut ev = Vec::new();
        for _ in 0..n {
            ev.push(ClassifiedEvidence::new(
                EvidenceRow { evidence_id: None, claim_id: None, scope_lock_id: None, confidence: conf, role: None, failure_mode: None },
                EvidenceRole::Support,
                EvidenceChannel::Validation,
            ));
            ev.push(ClassifiedEvidence::new(
                EvidenceRow { evidence_id: None, claim_id: None, scope_lock_id: None, confidence: conf, role: None, failure_mode: None },
                EvidenceRole::Refute,
                EvidenceChannel::Negative,
            ));
        }
        let d = compute_theory_change_action("c1", &ev);
        prop_assert!((d.conflict_score - 1.0).abs() < 1e-9);
        prop_assert_eq!(d.action, TheoryAction::Fork);
    }

    #[test]
    fn single_role_has_zero_entropy(n in 1usize..20, r in role()) {
        let ev: Vec<_> = (0..n)
            .map(|_| ClassifiedEvidence::new(
                EvidenceRow { evidence_id: None, claim_id: None, scope_lock_id: None, confidence: 0.5, role: None, failure_mode: None },
                r,
                EvidenceChannel::Validation,
            ))
            .collect();
        prop_assert_eq!(compute_entropy_proxy(&aggregate_evidence("c1", &ev)), 0.0);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{
    aggregate_evidence, compute_conflict_score_weighted, compute_entropy_proxy, EvidenceAggregate,
};
use crate::error::TheoryResult;
use crate::policy::TheoryPolicy;
use crate::row::ClassifiedEvidence;

/// Recommended change to a claim's standing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TheoryAction {
    /// Update the belief state in place.
    Revise,
    /// Split off a competing hypothesis.
    Fork,
    /// Suspend the claim over a method-validity attack.
    Quarantine,
    /// Not enough evidence to act.
    Hold,
}

impl TheoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TheoryAction::Revise => "revise",
            TheoryAction::Fork => "fork",
            TheoryAction::Quarantine => "quarantine",
            TheoryAction::Hold => "hold",
        }
    }
}

impl fmt::Display for TheoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// An action and the numbers behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionDecision {
    pub action: TheoryAction,
    pub conflict_score: f64,
    pub entropy: f64,
    pub rationale: String,
    pub evidence_summary: EvidenceAggregate,
}

/// Deterministic theory-change policy.
///
/// The operator never writes. Its output is a proposal for the intent
/// lifecycle, and every promotion to durable knowledge is approved
/// downstream.
#[derive(Clone, Debug, Default)]
pub struct TheoryOperator {
    policy: TheoryPolicy,
}

impl TheoryOperator {
    pub fn new(policy: TheoryPolicy) -> TheoryResult<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &TheoryPolicy {
        &self.policy
    }

    /// Decide the action for `claim_id`.
    ///
    /// Precedence: HOLD below the evidence minimum, then QUARANTINE on a
    /// high-confidence undercut, then FORK above the conflict threshold,
    /// else REVISE.
    pub fn decide(&self, claim_id: &str, evidence: &[ClassifiedEvidence]) -> ActionDecision {
        let agg = aggregate_evidence(claim_id, evidence);
        let p = &self.policy;

        let decision = if agg.total_count() < p.min_evidence_count {
            ActionDecision {
                action: TheoryAction::Hold,
                conflict_score: 0.0,
                entropy: 0.0,
                rationale: format!(
                    "Insufficient evidence (count={}, min={})",
                    agg.total_count(),
                    p.min_evidence_count
                ),
                evidence_summary: agg,
            }
        } else if agg.undercut_count > 0 && agg.undercut_max_conf > p.quarantine_threshold {
            ActionDecision {
                action: TheoryAction::Quarantine,
                conflict_score: 0.0,
                entropy: compute_entropy_proxy(&agg),
                rationale: format!(
                    "High-confidence undercut ({:.2}) suggests methodological issues",
                    agg.undercut_max_conf
                ),
                evidence_summary: agg,
            }
        } else {
            let conflict = compute_conflict_score_weighted(&agg, p.replicate_weight);
            let entropy = compute_entropy_proxy(&agg);
            if conflict > p.fork_threshold {
                ActionDecision {
                    action: TheoryAction::Fork,
                    conflict_score: conflict,
                    entropy,
                    rationale: format!(
                        "Conflict score {conflict:.2} exceeds threshold {}",
                        p.fork_threshold
                    ),
                    evidence_summary: agg,
                }
            } else {
                ActionDecision {
                    action: TheoryAction::Revise,
                    conflict_score: conflict,
                    entropy,
                    rationale: "Evidence is consistent enough to revise belief state".into(),
                    evidence_summary: agg,
                }
            }
        };

        debug!(
            claim_id,
            action = %decision.action,
            conflict_score = decision.conflict_score,
            entropy = decision.entropy,
            "theory change decided"
        );
        decision
    }
}

/// Decide with the default policy.
pub fn compute_theory_change_action(
    claim_id: &str,
    evidence: &[ClassifiedEvidence],
) -> ActionDecision {
    TheoryOperator::default().decide(claim_id, evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::EvidenceRow;
    use spine_types::{EvidenceChannel, EvidenceRole};

    fn ev(role: EvidenceRole, conf: f64) -> ClassifiedEvidence {
        ClassifiedEvidence::new(
            EvidenceRow {
                evidence_id: None,
                claim_id: Some("c1".into()),
                scope_lock_id: None,
                confidence: conf,
                role: Some(role),
                failure_mode: None,
            },
            role,
            EvidenceChannel::Validation,
        )
    }

    #[test]
    fn below_minimum_always_holds() {
        let d = compute_theory_change_action("c1", &[ev(EvidenceRole::Undercut, 1.0)]);
        assert_eq!(d.action, TheoryAction::Hold);
        assert_eq!(d.rationale, "Insufficient evidence (count=1, min=2)");
        assert_eq!(compute_theory_change_action("c1", &[]).action, TheoryAction::Hold);
    }

    #[test]
    fn strong_undercut_quarantines_over_conflict() {
        let d = compute_theory_change_action(
            "c1",
            &[
                ev(EvidenceRole::Support, 0.9),
                ev(EvidenceRole::Refute, 0.9),
                ev(EvidenceRole::Undercut, 0.85),
            ],
        );
        assert_eq!(d.action, TheoryAction::Quarantine);
        assert!(d.rationale.contains("0.85"));
    }

    #[test]
    fn weak_undercut_does_not_quarantine() {
        let d = compute_theory_change_action(
            "c1",
            &[ev(EvidenceRole::Support, 0.9), ev(EvidenceRole::Undercut, 0.8)],
        );
        assert_eq!(d.action, TheoryAction::Revise);
    }

    #[test]
    fn balanced_disagreement_forks() {
        let d = compute_theory_change_action(
            "c1",
            &[ev(EvidenceRole::Support, 0.8), ev(EvidenceRole::Refute, 0.75)],
        );
        assert_eq!(d.action, TheoryAction::Fork);
        assert!(d.conflict_score > 0.9);
    }

    #[test]
    fn consistent_support_revises() {
        let d = compute_theory_change_action(
            "c1",
            &[ev(EvidenceRole::Support, 0.9), ev(EvidenceRole::Support, 0.8)],
        );
        assert_eq!(d.action, TheoryAction::Revise);
        assert_eq!(d.conflict_score, 0.0);
        assert_eq!(d.evidence_summary.support_count, 2);
    }

    #[test]
    fn custom_policy_moves_the_fork_line() {
        let op = TheoryOperator::new(TheoryPolicy {
            fork_threshold: 0.99,
            ..TheoryPolicy::default()
        })
        .unwrap();
        let d = op.decide("c1", &[ev(EvidenceRole::Support, 0.8), ev(EvidenceRole::Refute, 0.6)]);
        assert_eq!(d.action, TheoryAction::Revise);
    }

    #[test]
    fn display_is_uppercase() {
        assert_eq!(TheoryAction::Quarantine.to_string(), "QUARANTINE");
        assert_eq!(TheoryAction::Fork.as_str(), "fork");
    }
}

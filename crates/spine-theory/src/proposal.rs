use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use spine_fingerprint::{evidence_fingerprint, make_proposal_id};
use spine_intent::StageRequest;
use spine_types::{Lane, ProposalId, ScopeLockId};
use tracing::info;

use crate::aggregate::EvidenceAggregate;
use crate::error::{TheoryError, TheoryResult};
use crate::operator::{TheoryAction, TheoryOperator};
use crate::row::ClassifiedEvidence;

/// Intent type theory-change proposals are staged as.
pub const PROPOSAL_INTENT_TYPE: &str = "stage_epistemic_proposal";

/// A theory-change recommendation awaiting review.
///
/// The id is minted once from the session, claim, action, evidence
/// fingerprints and policy hash, and is never recomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TheoryChangeProposal {
    proposal_id: ProposalId,
    pub session_id: String,
    pub claim_id: String,
    pub action: TheoryAction,
    pub conflict_score: f64,
    pub entropy: f64,
    pub rationale: String,
    /// Sorted. Repeated ids are rejected when the proposal is generated.
    pub evidence_ids: Vec<String>,
    pub evidence_summary: EvidenceAggregate,
    pub policy_hash: String,
}

impl TheoryChangeProposal {
    pub fn proposal_id(&self) -> &ProposalId {
        &self.proposal_id
    }

    /// Payload for a `stage_epistemic_proposal` intent.
    ///
    /// The proposal id travels on the intent envelope, not in the payload.
    pub fn to_intent_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("action".into(), json!(self.action.as_str()));
        payload.insert("claim_id".into(), json!(self.claim_id));
        payload.insert("evidence_ids".into(), json!(self.evidence_ids));
        payload.insert("conflict_score".into(), json!(self.conflict_score));
        payload.insert("rationale".into(), json!(self.rationale));
        payload
    }

    /// Stage request carrying this proposal.
    pub fn stage_request(&self, lane: Lane, scope_lock_id: Option<ScopeLockId>) -> StageRequest {
        let mut request = StageRequest::new(PROPOSAL_INTENT_TYPE, lane, self.to_intent_payload())
            .with_proposal(self.proposal_id.clone());
        request.scope_lock_id = scope_lock_id;
        request
    }
}

impl TheoryOperator {
    /// Decide and package a proposal for `claim_id`.
    ///
    /// Every row must carry an evidence id that no other row repeats, and
    /// rows that name a claim must name this one.
    pub fn generate_proposal(
        &self,
        session_id: &str,
        claim_id: &str,
        evidence: &[ClassifiedEvidence],
    ) -> TheoryResult<TheoryChangeProposal> {
        let mut fingerprints = Vec::with_capacity(evidence.len());
        let mut evidence_ids = Vec::with_capacity(evidence.len());
        let mut seen = HashSet::with_capacity(evidence.len());
        for (index, ev) in evidence.iter().enumerate() {
            if let Some(found) = ev.row.claim_id.as_deref() {
                if found != claim_id {
                    return Err(TheoryError::ClaimMismatch {
                        index,
                        expected: claim_id.to_string(),
                        found: found.to_string(),
                    });
                }
            }
            let id = ev
                .row
                .evidence_id
                .as_deref()
                .ok_or(TheoryError::MissingEvidenceId { index })?;
            if !seen.insert(id) {
                return Err(TheoryError::DuplicateEvidenceId {
                    index,
                    evidence_id: id.to_string(),
                });
            }
            fingerprints.push(evidence_fingerprint(id, ev.role, ev.channel));
            evidence_ids.push(id.to_string());
        }
        evidence_ids.sort();

        let decision = self.decide(claim_id, evidence);
        let policy_hash = self.policy().policy_hash();
        let proposal_id = ProposalId(make_proposal_id(
            session_id,
            claim_id,
            decision.action.as_str(),
            &fingerprints,
            &policy_hash,
        ));

        info!(
            proposal_id = %proposal_id,
            claim_id,
            action = %decision.action,
            evidence = evidence_ids.len(),
            "theory change proposal generated"
        );

        Ok(TheoryChangeProposal {
            proposal_id,
            session_id: session_id.to_string(),
            claim_id: claim_id.to_string(),
            action: decision.action,
            conflict_score: decision.conflict_score,
            entropy: decision.entropy,
            rationale: decision.rationale,
            evidence_ids,
            evidence_summary: decision.evidence_summary,
            policy_hash,
        })
    }
}

/// Generate a proposal with the default policy.
pub fn generate_proposal(
    session_id: &str,
    claim_id: &str,
    evidence: &[ClassifiedEvidence],
) -> TheoryResult<TheoryChangeProposal> {
    TheoryOperator::default().generate_proposal(session_id, claim_id, evidence)
}

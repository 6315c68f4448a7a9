use serde_json::{json, Value};
use spine_types::{EvidenceChannel, EvidenceRole};

use crate::digest::{prefixed, sha256_canonical};

fn evidence_payload(session_id: &str, claim_id: &str, execution_id: &str, template_qid: &str) -> Value {
    json!({
        "sid": session_id,
        "cid": claim_id,
        "eid": execution_id,
        "qid": template_qid,
    })
}

/// Validation-channel evidence id: `ev-` + 32 hex chars.
pub fn make_evidence_id(
    session_id: &str,
    claim_id: &str,
    execution_id: &str,
    template_qid: &str,
) -> String {
    let payload = evidence_payload(session_id, claim_id, execution_id, template_qid);
    prefixed("ev-", &with_channel(payload, EvidenceChannel::Validation), 32)
}

/// Negative-channel evidence id: `nev-` + 32 hex chars.
///
/// Same inputs as [`make_evidence_id`], never the same value.
pub fn make_negative_evidence_id(
    session_id: &str,
    claim_id: &str,
    execution_id: &str,
    template_qid: &str,
) -> String {
    let payload = evidence_payload(session_id, claim_id, execution_id, template_qid);
    prefixed("nev-", &with_channel(payload, EvidenceChannel::Negative), 32)
}

/// Dispatch to the evidence id constructor for `channel`.
pub fn make_channel_evidence_id(
    channel: EvidenceChannel,
    session_id: &str,
    claim_id: &str,
    execution_id: &str,
    template_qid: &str,
) -> String {
    match channel {
        EvidenceChannel::Validation => {
            make_evidence_id(session_id, claim_id, execution_id, template_qid)
        }
        EvidenceChannel::Negative => {
            make_negative_evidence_id(session_id, claim_id, execution_id, template_qid)
        }
    }
}

fn with_channel(mut payload: Value, channel: EvidenceChannel) -> Value {
    if let Value::Object(ref mut map) = payload {
        map.insert("ch".into(), Value::String(channel.as_str().into()));
    }
    payload
}

/// Reproducibility capsule id for a sealed template run: `cap-` + 32 hex chars.
pub fn make_capsule_id(
    template_qid: &str,
    spec_hash: &str,
    code_hash: &str,
    retrieval_snapshot_digest: Option<&str>,
) -> String {
    let payload = json!({
        "qid": template_qid,
        "spec": spec_hash,
        "code": code_hash,
        "retr": retrieval_snapshot_digest.unwrap_or(""),
    });
    prefixed("cap-", &payload, 32)
}

/// `id:role:channel`, the unit that proposal ids are computed over.
///
/// Role and channel participate so that reclassifying a piece of evidence
/// changes every proposal that cites it.
pub fn evidence_fingerprint(evidence_id: &str, role: EvidenceRole, channel: EvidenceChannel) -> String {
    format!("{evidence_id}:{}:{}", role.as_str(), channel.as_str())
}

/// Theory-change proposal id: `prop-` + 24 hex chars.
///
/// `evidence_fingerprints` are sorted before hashing; callers may pass them
/// in any order.
pub fn make_proposal_id(
    session_id: &str,
    claim_id: &str,
    action: &str,
    evidence_fingerprints: &[String],
    policy_hash: &str,
) -> String {
    let mut fps: Vec<&str> = evidence_fingerprints.iter().map(String::as_str).collect();
    fps.sort_unstable();
    let payload = json!({
        "sid": session_id,
        "cid": claim_id,
        "act": action,
        "evfp": fps,
        "ph": policy_hash,
    });
    prefixed("prop-", &payload, 24)
}

/// Policy parameters that determine theory-change decisions.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyFingerprint<'a> {
    pub fork_threshold: f64,
    pub quarantine_threshold: f64,
    pub min_evidence_count: usize,
    pub replicate_weight: f64,
    pub operator_version: &'a str,
}

/// 16 hex chars identifying a policy version.
pub fn make_policy_hash(policy: &PolicyFingerprint<'_>) -> String {
    let payload = json!({
        "FORK_THRESHOLD": policy.fork_threshold,
        "QUARANTINE_THRESHOLD": policy.quarantine_threshold,
        "MIN_EVIDENCE_COUNT": policy.min_evidence_count,
        "REPLICATE_WEIGHT": policy.replicate_weight,
        "OPERATOR_VERSION": policy.operator_version,
    });
    sha256_canonical(&payload)[..16].to_string()
}

/// Everything a run capsule id binds together.
#[derive(Clone, Debug, Default)]
pub struct RunCapsuleInputs<'a> {
    pub session_id: &'a str,
    pub query_hash: &'a str,
    pub scope_lock_id: Option<&'a str>,
    pub intent_id: Option<&'a str>,
    pub proposal_id: Option<&'a str>,
    pub evidence_ids: &'a [String],
}

/// Run capsule id: `run-` + 32 hex chars. Evidence order is irrelevant.
pub fn make_run_capsule_id(inputs: &RunCapsuleInputs<'_>) -> String {
    let mut evids: Vec<&str> = inputs.evidence_ids.iter().map(String::as_str).collect();
    evids.sort_unstable();
    let payload = json!({
        "sid": inputs.session_id,
        "qh": inputs.query_hash,
        "slid": inputs.scope_lock_id.unwrap_or(""),
        "iid": inputs.intent_id.unwrap_or(""),
        "pid": inputs.proposal_id.unwrap_or(""),
        "evids": evids,
    });
    prefixed("run-", &payload, 32)
}

/// Mutation id for an executed epistemic write: `mut-` + 24 hex chars.
pub fn make_mutation_id(session_id: &str, intent_id: &str, claim_id: &str, to_status: &str) -> String {
    let payload = json!({
        "sid": session_id,
        "iid": intent_id,
        "cid": claim_id,
        "to": to_status,
    });
    prefixed("mut-", &payload, 24)
}

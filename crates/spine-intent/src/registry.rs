//! Declarative per-intent-type policy.
//!
//! Unknown intent types do not exist: there is no fallback spec.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spine_types::Lane;

use crate::error::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScopeLockPolicy {
    Required,
    Optional,
    Forbidden,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalPolicy {
    Auto,
    Hitl,
    Deny,
}

/// Policy for one intent type.
///
/// A lane missing from the per-lane tables reads as `Forbidden` scope lock
/// and `Deny` approval.
#[derive(Clone, Copy, Debug)]
pub struct IntentSpec {
    pub intent_type: &'static str,
    pub allowed_fields: &'static [&'static str],
    pub required_fields: &'static [&'static str],
    pub required_id_fields: &'static [&'static str],
    pub allowed_lanes: &'static [Lane],
    pub scope_lock_by_lane: &'static [(Lane, ScopeLockPolicy)],
    pub approval_by_lane: &'static [(Lane, ApprovalPolicy)],
}

impl IntentSpec {
    pub fn scope_lock_policy(&self, lane: Lane) -> ScopeLockPolicy {
        self.scope_lock_by_lane
            .iter()
            .find(|(l, _)| *l == lane)
            .map(|(_, p)| *p)
            .unwrap_or(ScopeLockPolicy::Forbidden)
    }

    pub fn approval_policy(&self, lane: Lane) -> ApprovalPolicy {
        self.approval_by_lane
            .iter()
            .find(|(l, _)| *l == lane)
            .map(|(_, p)| *p)
            .unwrap_or(ApprovalPolicy::Deny)
    }

    pub fn allows_lane(&self, lane: Lane) -> bool {
        self.allowed_lanes.contains(&lane)
    }

    /// Check `payload` against this intent type for `lane`.
    pub fn validate_payload(
        &self,
        payload: &Map<String, Value>,
        lane: Lane,
    ) -> Result<(), ValidationError> {
        let intent_type = self.intent_type.to_string();

        if payload.contains_key("lane") {
            return Err(ValidationError::LaneInPayload { intent_type });
        }

        if !self.allows_lane(lane) {
            let allowed = self
                .allowed_lanes
                .iter()
                .map(Lane::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ValidationError::LaneNotAllowed {
                intent_type,
                lane,
                allowed,
            });
        }

        let missing: Vec<String> = self
            .required_fields
            .iter()
            .filter(|f| payload.get(**f).map_or(true, Value::is_null))
            .map(|f| f.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields {
                intent_type,
                fields: missing,
            });
        }

        let mut unknown: Vec<String> = payload
            .keys()
            .filter(|k| !self.allowed_fields.contains(&k.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(ValidationError::UnknownFields {
                intent_type,
                fields: unknown,
            });
        }

        let blank: Vec<String> = self
            .required_id_fields
            .iter()
            .filter(|f| match payload.get(**f) {
                None => false,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => true,
            })
            .map(|f| f.to_string())
            .collect();
        if !blank.is_empty() {
            return Err(ValidationError::BlankIdFields {
                intent_type,
                fields: blank,
            });
        }

        Ok(())
    }
}

const BOTH: &[Lane] = &[Lane::Grounded, Lane::Speculative];
const GROUNDED: &[Lane] = &[Lane::Grounded];
const SPECULATIVE: &[Lane] = &[Lane::Speculative];

const OPTIONAL_BOTH: &[(Lane, ScopeLockPolicy)] = &[
    (Lane::Grounded, ScopeLockPolicy::Optional),
    (Lane::Speculative, ScopeLockPolicy::Optional),
];
const OPTIONAL_SPECULATIVE: &[(Lane, ScopeLockPolicy)] =
    &[(Lane::Speculative, ScopeLockPolicy::Optional)];
const REQUIRED_GROUNDED: &[(Lane, ScopeLockPolicy)] =
    &[(Lane::Grounded, ScopeLockPolicy::Required)];

const AUTO_BOTH: &[(Lane, ApprovalPolicy)] = &[
    (Lane::Grounded, ApprovalPolicy::Auto),
    (Lane::Speculative, ApprovalPolicy::Auto),
];
const AUTO_SPECULATIVE: &[(Lane, ApprovalPolicy)] = &[(Lane::Speculative, ApprovalPolicy::Auto)];
const HITL_GROUNDED: &[(Lane, ApprovalPolicy)] = &[(Lane::Grounded, ApprovalPolicy::Hitl)];

const BUILTIN: &[IntentSpec] = &[
    // Operational writes
    IntentSpec {
        intent_type: "metrics_update",
        allowed_fields: &["metrics", "session_id", "timestamp"],
        required_fields: &["metrics"],
        required_id_fields: &[],
        allowed_lanes: BOTH,
        scope_lock_by_lane: OPTIONAL_BOTH,
        approval_by_lane: AUTO_BOTH,
    },
    IntentSpec {
        intent_type: "cache_write",
        allowed_fields: &["key", "value", "ttl_seconds"],
        required_fields: &["key", "value"],
        required_id_fields: &[],
        allowed_lanes: BOTH,
        scope_lock_by_lane: OPTIONAL_BOTH,
        approval_by_lane: AUTO_BOTH,
    },
    IntentSpec {
        intent_type: "trace_append",
        allowed_fields: &["trace_id", "event", "metadata"],
        required_fields: &["trace_id", "event"],
        required_id_fields: &[],
        allowed_lanes: BOTH,
        scope_lock_by_lane: OPTIONAL_BOTH,
        approval_by_lane: AUTO_BOTH,
    },
    // Speculative writes
    IntentSpec {
        intent_type: "create_claim",
        allowed_fields: &["claim_id", "content", "hypothesis_id"],
        required_fields: &["claim_id", "content"],
        required_id_fields: &["claim_id"],
        allowed_lanes: SPECULATIVE,
        scope_lock_by_lane: OPTIONAL_SPECULATIVE,
        approval_by_lane: AUTO_SPECULATIVE,
    },
    // Epistemic writes: grounded lane, scope lock and human review required
    IntentSpec {
        intent_type: "create_proposition",
        allowed_fields: &["claim_id", "content", "belief_state", "epistemic_status"],
        required_fields: &["claim_id", "content"],
        required_id_fields: &["claim_id"],
        allowed_lanes: GROUNDED,
        scope_lock_by_lane: REQUIRED_GROUNDED,
        approval_by_lane: HITL_GROUNDED,
    },
    IntentSpec {
        intent_type: "update_epistemic_status",
        allowed_fields: &["claim_id", "new_status", "rationale", "evidence_ids"],
        required_fields: &["claim_id", "new_status"],
        required_id_fields: &["claim_id"],
        allowed_lanes: GROUNDED,
        scope_lock_by_lane: REQUIRED_GROUNDED,
        approval_by_lane: HITL_GROUNDED,
    },
    IntentSpec {
        intent_type: "refute_claim",
        allowed_fields: &["claim_id", "refutation_evidence", "rationale"],
        required_fields: &["claim_id", "refutation_evidence"],
        required_id_fields: &["claim_id"],
        allowed_lanes: GROUNDED,
        scope_lock_by_lane: REQUIRED_GROUNDED,
        approval_by_lane: HITL_GROUNDED,
    },
    IntentSpec {
        intent_type: "revise_proposition",
        allowed_fields: &[
            "claim_id",
            "new_belief_state",
            "evidence_summary",
            "conflict_score",
        ],
        required_fields: &["claim_id", "new_belief_state", "evidence_summary"],
        required_id_fields: &["claim_id"],
        allowed_lanes: GROUNDED,
        scope_lock_by_lane: REQUIRED_GROUNDED,
        approval_by_lane: HITL_GROUNDED,
    },
    IntentSpec {
        intent_type: "fork_proposition",
        allowed_fields: &["parent_claim_id", "new_claim_id", "content", "fork_rationale"],
        required_fields: &["parent_claim_id", "new_claim_id", "content", "fork_rationale"],
        required_id_fields: &["parent_claim_id", "new_claim_id"],
        allowed_lanes: GROUNDED,
        scope_lock_by_lane: REQUIRED_GROUNDED,
        approval_by_lane: HITL_GROUNDED,
    },
    IntentSpec {
        intent_type: "quarantine_proposition",
        allowed_fields: &["claim_id", "quarantine_reason", "undercut_evidence"],
        required_fields: &["claim_id", "quarantine_reason"],
        required_id_fields: &["claim_id"],
        allowed_lanes: GROUNDED,
        scope_lock_by_lane: REQUIRED_GROUNDED,
        approval_by_lane: HITL_GROUNDED,
    },
    // Proposal staging: records a theory-change proposal, mutates nothing
    IntentSpec {
        intent_type: "stage_epistemic_proposal",
        allowed_fields: &[
            "action",
            "claim_id",
            "evidence_ids",
            "conflict_score",
            "rationale",
        ],
        required_fields: &["action", "claim_id"],
        required_id_fields: &["claim_id"],
        allowed_lanes: BOTH,
        scope_lock_by_lane: OPTIONAL_BOTH,
        approval_by_lane: AUTO_BOTH,
    },
];

/// Intent-type table.
#[derive(Clone, Debug)]
pub struct IntentRegistry {
    specs: BTreeMap<&'static str, IntentSpec>,
}

impl IntentRegistry {
    /// Registry holding exactly `specs`.
    pub fn new(specs: impl IntoIterator<Item = IntentSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.intent_type, s)).collect(),
        }
    }

    /// The built-in intent types.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.iter().copied())
    }

    pub fn get(&self, intent_type: &str) -> Option<&IntentSpec> {
        self.specs.get(intent_type)
    }

    pub fn spec(&self, intent_type: &str) -> Result<&IntentSpec, ValidationError> {
        self.get(intent_type)
            .ok_or_else(|| ValidationError::UnknownIntentType(intent_type.to_string()))
    }

    pub fn intent_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.keys().copied()
    }

    /// Validate `payload` for `intent_type` in `lane`, returning the spec.
    pub fn validate_payload(
        &self,
        intent_type: &str,
        payload: &Map<String, Value>,
        lane: Lane,
    ) -> Result<&IntentSpec, ValidationError> {
        let spec = self.spec(intent_type)?;
        spec.validate_payload(payload, lane)?;
        Ok(spec)
    }
}

impl Default for IntentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

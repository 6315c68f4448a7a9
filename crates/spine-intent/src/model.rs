use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spine_types::{EventId, IntentId, Lane, ProposalId, ScopeLockId};

/// Write-intent lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Staged,
    AwaitingHitl,
    Approved,
    Rejected,
    Deferred,
    Cancelled,
    Expired,
    Executed,
    Failed,
}

impl IntentStatus {
    pub const ALL: [IntentStatus; 9] = [
        IntentStatus::Staged,
        IntentStatus::AwaitingHitl,
        IntentStatus::Approved,
        IntentStatus::Rejected,
        IntentStatus::Deferred,
        IntentStatus::Cancelled,
        IntentStatus::Expired,
        IntentStatus::Executed,
        IntentStatus::Failed,
    ];

    /// Outgoing edges of the state machine. Terminal states have none.
    pub fn allowed_transitions(&self) -> &'static [IntentStatus] {
        use IntentStatus::*;
        match self {
            Staged => &[AwaitingHitl, Cancelled],
            AwaitingHitl => &[Approved, Rejected, Deferred, Cancelled, Expired],
            Approved => &[Executed, Failed],
            Deferred => &[AwaitingHitl, Expired],
            Rejected | Cancelled | Expired | Executed | Failed => &[],
        }
    }

    pub fn can_transition_to(&self, to: IntentStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Whether a batch hold may park this status in `Deferred`.
    ///
    /// Batch hold is the only path out of `Approved` other than execution
    /// or failure, and it is only taken by `execute_batch`.
    pub fn allows_batch_hold(&self) -> bool {
        matches!(self, IntentStatus::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Staged => "staged",
            IntentStatus::AwaitingHitl => "awaiting_hitl",
            IntentStatus::Approved => "approved",
            IntentStatus::Rejected => "rejected",
            IntentStatus::Deferred => "deferred",
            IntentStatus::Cancelled => "cancelled",
            IntentStatus::Expired => "expired",
            IntentStatus::Executed => "executed",
            IntentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        IntentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| format!("unknown intent status '{s}'"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Human,
    System,
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorType::Human => f.write_str("human"),
            ActorType::System => f.write_str("system"),
        }
    }
}

/// A staged request to mutate durable state.
///
/// Created by `stage()`, mutated only through lifecycle transitions, never
/// deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteIntent {
    pub intent_id: IntentId,
    pub intent_type: String,
    pub lane: Lane,
    pub payload: Map<String, Value>,
    pub status: IntentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_lock_id: Option<ScopeLockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<ProposalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes_intent_id: Option<IntentId>,
}

impl WriteIntent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// `payload.evidence_ids` when it is an array of strings.
    ///
    /// Any other shape reads as absent.
    pub fn payload_evidence_ids(&self) -> Option<Vec<String>> {
        let items = self.payload.get("evidence_ids")?.as_array()?;
        items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// `payload.claim_id` when present as a string.
    pub fn payload_claim_id(&self) -> Option<&str> {
        self.payload.get("claim_id").and_then(Value::as_str)
    }

    /// Deterministic id for the mutation this intent makes to its claim.
    pub fn mutation_id(&self, session_id: &str, to_status: &str) -> String {
        spine_fingerprint::make_mutation_id(
            session_id,
            self.intent_id.as_str(),
            self.payload_claim_id().unwrap_or_default(),
            to_status,
        )
    }
}

/// Append-only audit record of one transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentStatusEvent {
    pub event_id: EventId,
    pub intent_id: IntentId,
    /// Position in the intent's history, assigned by the store.
    #[serde(default)]
    pub sequence: u64,
    pub from_status: IntentStatus,
    pub to_status: IntentStatus,
    pub actor_type: ActorType,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutation_ids: Vec<String>,
}

impl IntentStatusEvent {
    pub fn new(
        intent_id: IntentId,
        from_status: IntentStatus,
        to_status: IntentStatus,
        actor_type: ActorType,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::generate(),
            intent_id,
            sequence: 0,
            from_status,
            to_status,
            actor_type,
            actor_id: actor_id.into(),
            rationale: None,
            created_at: Utc::now(),
            defer_until: None,
            execution_id: None,
            error: None,
            mutation_ids: Vec::new(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_defer_until(mut self, until: DateTime<Utc>) -> Self {
        self.defer_until = Some(until);
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_mutation_ids(mut self, ids: Vec<String>) -> Self {
        self.mutation_ids = ids;
        self
    }
}

/// Input to `IntentLifecycle::stage`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageRequest {
    pub intent_type: String,
    pub lane: Lane,
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub scope_lock_id: Option<ScopeLockId>,
    #[serde(default)]
    pub proposal_id: Option<ProposalId>,
    #[serde(default)]
    pub impact_score: Option<f64>,
    /// Explicit expiry; the configured default applies when absent.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub supersedes_intent_id: Option<IntentId>,
}

impl StageRequest {
    pub fn new(intent_type: impl Into<String>, lane: Lane, payload: Map<String, Value>) -> Self {
        Self {
            intent_type: intent_type.into(),
            lane,
            payload,
            scope_lock_id: None,
            proposal_id: None,
            impact_score: None,
            expires_at: None,
            supersedes_intent_id: None,
        }
    }

    pub fn with_scope_lock(mut self, scope_lock_id: impl Into<ScopeLockId>) -> Self {
        self.scope_lock_id = Some(scope_lock_id.into());
        self
    }

    pub fn with_proposal(mut self, proposal_id: impl Into<ProposalId>) -> Self {
        self.proposal_id = Some(proposal_id.into());
        self
    }

    pub fn with_impact_score(mut self, score: f64) -> Self {
        self.impact_score = Some(score);
        self
    }

    pub fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn superseding(mut self, intent_id: IntentId) -> Self {
        self.supersedes_intent_id = Some(intent_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use IntentStatus::*;

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for status in [Rejected, Cancelled, Expired, Executed, Failed] {
            assert!(status.is_terminal(), "{status} should be terminal");
            for to in IntentStatus::ALL {
                assert!(!status.can_transition_to(to));
            }
        }
    }

    #[test]
    fn executed_only_reachable_from_approved() {
        for from in IntentStatus::ALL {
            assert_eq!(from.can_transition_to(Executed), from == Approved);
        }
    }

    #[test]
    fn cancellation_only_before_decision() {
        let cancellable: Vec<_> = IntentStatus::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(Cancelled))
            .collect();
        assert_eq!(cancellable, vec![Staged, AwaitingHitl]);
    }

    #[test]
    fn status_parsing_accepts_kebab_case() {
        assert_eq!("awaiting-hitl".parse::<IntentStatus>().unwrap(), AwaitingHitl);
        assert_eq!("EXECUTED".parse::<IntentStatus>().unwrap(), Executed);
        assert!("done".parse::<IntentStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&AwaitingHitl).unwrap(), "\"awaiting_hitl\"");
    }

    #[test]
    fn payload_evidence_ids_requires_string_array() {
        let mut payload = Map::new();
        payload.insert("evidence_ids".into(), serde_json::json!(["ev-1", "ev-2"]));
        let mut intent = WriteIntent {
            intent_id: IntentId::from("intent_x"),
            intent_type: "stage_epistemic_proposal".into(),
            lane: Lane::Grounded,
            payload,
            status: Staged,
            scope_lock_id: None,
            proposal_id: None,
            impact_score: None,
            created_at: Utc::now(),
            expires_at: Utc::now(),
            supersedes_intent_id: None,
        };
        assert_eq!(
            intent.payload_evidence_ids(),
            Some(vec!["ev-1".to_string(), "ev-2".to_string()])
        );

        intent.payload.insert("evidence_ids".into(), serde_json::json!("ev-1"));
        assert_eq!(intent.payload_evidence_ids(), None);

        intent.payload.insert("evidence_ids".into(), serde_json::json!(["ev-1", 3]));
        assert_eq!(intent.payload_evidence_ids(), None);
    }
}

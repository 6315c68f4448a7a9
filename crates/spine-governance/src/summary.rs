use serde::{Deserialize, Serialize};
use spine_types::{IntentId, Lane, ProposalId, ScopeLockId};

use crate::code::{GateStatus, HoldCode};
use crate::override_policy::PolicyOverride;

pub const CONTRACT_VERSION: &str = "v1";

/// `gate_code` of a coherent STAGED verdict.
pub const GATE_CODE_PASS: &str = "PASS";
/// `gate_code` of a STAGED verdict forced by a local override.
pub const GATE_CODE_UNSAFE_BYPASS: &str = "UNSAFE_BYPASS";

/// What the session produced, as seen by the gate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateInput {
    pub session_id: Option<String>,
    pub lane: Option<Lane>,
    pub persisted_evidence_ids: Vec<String>,
    pub intent_id: Option<IntentId>,
    pub proposal_id: Option<ProposalId>,
    /// Error text from upstream proposal generation, if it failed.
    pub proposal_error: Option<String>,
    pub mutation_ids: Vec<String>,
    /// Whether durable mutations were committed during the session.
    pub durable_mutations_committed: bool,
    /// Scope lock held in session state.
    pub scope_lock_id: Option<ScopeLockId>,
}

impl GateInput {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    pub fn with_evidence<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persisted_evidence_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_intent(mut self, intent_id: IntentId, proposal_id: Option<ProposalId>) -> Self {
        self.intent_id = Some(intent_id);
        self.proposal_id = proposal_id;
        self
    }

    pub fn with_proposal_error(mut self, error: impl Into<String>) -> Self {
        self.proposal_error = Some(error.into());
        self
    }

    /// Record committed mutations. An empty list with `committed` set is the
    /// missing-linkage case.
    pub fn with_mutations(mut self, ids: Vec<String>, committed: bool) -> Self {
        self.mutation_ids = ids;
        self.durable_mutations_committed = committed;
        self
    }

    pub fn with_scope_lock(mut self, scope_lock_id: impl Into<ScopeLockId>) -> Self {
        self.scope_lock_id = Some(scope_lock_id.into());
        self
    }
}

/// Gate verdict envelope consumed by synthesis and audit export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSummary {
    pub contract_version: String,
    pub status: GateStatus,
    pub lane: Option<Lane>,
    pub session_id: Option<String>,
    pub persisted_evidence_ids: Vec<String>,
    pub intent_id: Option<IntentId>,
    pub proposal_id: Option<ProposalId>,
    pub mutation_ids: Vec<String>,
    pub scope_lock_id: Option<ScopeLockId>,
    pub hold_code: Option<HoldCode>,
    pub hold_reason: Option<String>,
    pub gate_code: String,
    pub failure_reason: Option<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_override: Option<PolicyOverride>,
}

impl GovernanceSummary {
    pub(crate) fn from_input(input: &GateInput, status: GateStatus, gate_code: impl Into<String>) -> Self {
        Self {
            contract_version: CONTRACT_VERSION.to_string(),
            status,
            lane: input.lane,
            session_id: input.session_id.clone(),
            persisted_evidence_ids: input.persisted_evidence_ids.clone(),
            intent_id: input.intent_id.clone(),
            proposal_id: input.proposal_id.clone(),
            mutation_ids: input.mutation_ids.clone(),
            scope_lock_id: input.scope_lock_id.clone(),
            hold_code: None,
            hold_reason: None,
            gate_code: gate_code.into(),
            failure_reason: input.proposal_error.clone(),
            duration_ms: 0,
            policy_override: None,
        }
    }

    pub fn is_staged(&self) -> bool {
        self.status == GateStatus::Staged
    }

    pub fn is_hold(&self) -> bool {
        self.status == GateStatus::Hold
    }
}

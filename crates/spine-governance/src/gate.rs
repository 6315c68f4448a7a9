use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use spine_intent::{IntentStore, WriteIntent};
use tracing::{debug, info};

use crate::code::{GateStatus, HoldCode};
use crate::config::GateConfig;
use crate::override_policy::{evaluate_override, OverrideEnvironment};
use crate::summary::{GateInput, GovernanceSummary, GATE_CODE_PASS, GATE_CODE_UNSAFE_BYPASS};

/// A failed gate check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hold {
    pub code: HoldCode,
    pub reason: String,
}

impl Hold {
    fn new(code: HoldCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// The governance coherence gate.
///
/// Decides STAGED or HOLD for a session by checking its persisted evidence
/// against the canonical stored intent. The gate reads the store and never
/// writes to it.
pub struct GovernanceGate {
    store: Arc<dyn IntentStore>,
    config: GateConfig,
    environment: OverrideEnvironment,
}

impl GovernanceGate {
    pub fn new(store: Arc<dyn IntentStore>, config: GateConfig) -> Self {
        Self {
            store,
            config,
            environment: OverrideEnvironment::from_env(),
        }
    }

    /// Replace the captured process environment.
    pub fn with_environment(mut self, environment: OverrideEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate `input`. HOLD is a verdict, not an error.
    pub async fn evaluate(&self, input: &GateInput) -> GovernanceSummary {
        let started = Instant::now();
        let outcome = match precheck(input) {
            Some(hold) => Err(hold),
            None => self.check_coherence(input).await,
        };

        let mut summary = match outcome {
            Ok(()) => GovernanceSummary::from_input(input, GateStatus::Staged, GATE_CODE_PASS),
            Err(hold) => self.hold_or_override(input, hold),
        };
        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match summary.hold_code {
            Some(code) => info!(
                session_id = ?input.session_id,
                intent_id = ?input.intent_id,
                hold_code = %code,
                "governance gate HOLD"
            ),
            None => info!(
                session_id = ?input.session_id,
                intent_id = ?input.intent_id,
                gate_code = %summary.gate_code,
                "governance gate STAGED"
            ),
        }
        summary
    }

    fn hold_or_override(&self, input: &GateInput, hold: Hold) -> GovernanceSummary {
        match evaluate_override(&self.config, &self.environment, hold.code) {
            Ok(granted) => {
                let mut summary =
                    GovernanceSummary::from_input(input, GateStatus::Staged, GATE_CODE_UNSAFE_BYPASS);
                summary.hold_reason = Some(hold.reason);
                summary.policy_override = Some(granted);
                summary
            }
            Err(denied) => {
                debug!(error = %denied, "override not applied");
                let mut summary =
                    GovernanceSummary::from_input(input, GateStatus::Hold, hold.code.as_str());
                summary.hold_code = Some(hold.code);
                summary.hold_reason = Some(hold.reason);
                summary
            }
        }
    }

    /// Coherence of the canonical stored intent with the session state.
    async fn check_coherence(&self, input: &GateInput) -> Result<(), Hold> {
        let Some(intent_id) = input.intent_id.as_ref() else {
            return Err(Hold::new(HoldCode::NoIntentStaged, "No write intent was staged"));
        };
        let intent = match self.store.get_intent(intent_id).await {
            Ok(Some(intent)) => intent,
            Ok(None) => {
                return Err(Hold::new(
                    HoldCode::IntentNotFound,
                    format!("Intent {intent_id} not found in intent store"),
                ))
            }
            Err(err) => {
                return Err(Hold::new(
                    HoldCode::IntentStoreUnavailable,
                    format!("Intent store unavailable while loading {intent_id}: {err}"),
                ))
            }
        };
        check_intent(&intent, input)
    }
}

/// Ladder checks that need no store access. First match wins.
pub fn precheck(input: &GateInput) -> Option<Hold> {
    if let Some(err) = input.proposal_error.as_deref() {
        return Some(Hold::new(
            HoldCode::ProposalGenerationError,
            format!("Proposal generation failed: {err}"),
        ));
    }
    if input.persisted_evidence_ids.is_empty() {
        return Some(Hold::new(
            HoldCode::NoEvidencePersisted,
            "No evidence was persisted for this session",
        ));
    }
    if input.intent_id.as_ref().map_or(true, |id| id.is_blank()) {
        return Some(Hold::new(HoldCode::NoIntentStaged, "No write intent was staged"));
    }
    if input.durable_mutations_committed && input.mutation_ids.is_empty() {
        return Some(Hold::new(
            HoldCode::MissingCapsuleLinkage,
            "Durable mutations were committed but no mutation ids were recorded",
        ));
    }
    None
}

/// Coherence checks against a loaded intent. First failure wins.
pub fn check_intent(intent: &WriteIntent, input: &GateInput) -> Result<(), Hold> {
    if intent.proposal_id != input.proposal_id {
        return Err(Hold::new(
            HoldCode::IntentProposalMismatch,
            format!(
                "Intent {} carries proposal {}, expected {}",
                intent.intent_id,
                display_opt(intent.proposal_id.as_ref()),
                display_opt(input.proposal_id.as_ref())
            ),
        ));
    }

    let intent_ids = match intent.payload_evidence_ids() {
        Some(ids) if !ids.is_empty() => ids,
        _ => {
            return Err(Hold::new(
                HoldCode::IntentEvidenceIdsMissing,
                format!("Intent {} payload has no evidence_ids", intent.intent_id),
            ))
        }
    };

    let (only_in_intent, only_in_state) =
        multiset_difference(&intent_ids, &input.persisted_evidence_ids);
    if !only_in_intent.is_empty() || !only_in_state.is_empty() {
        return Err(Hold::new(
            HoldCode::EvidenceSetMismatch,
            format!(
                "Intent evidence_ids differ from persisted evidence: only_in_intent={only_in_intent:?}, only_in_state={only_in_state:?}"
            ),
        ));
    }

    if let (Some(stored), Some(state)) = (&intent.scope_lock_id, &input.scope_lock_id) {
        if stored != state {
            return Err(Hold::new(
                HoldCode::ScopeLockMismatch,
                format!("Intent scope lock {stored} differs from session scope lock {state}"),
            ));
        }
    }
    Ok(())
}

fn display_opt<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "<none>".to_string(), |v| v.to_string())
}

/// Elements of `left` not matched in `right` and vice versa, counting
/// duplicates. Both results are sorted.
fn multiset_difference(left: &[String], right: &[String]) -> (Vec<String>, Vec<String>) {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for id in left {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    for id in right {
        *counts.entry(id.as_str()).or_default() -= 1;
    }
    let mut only_left = Vec::new();
    let mut only_right = Vec::new();
    for (id, n) in counts {
        let target = if n > 0 { &mut only_left } else { &mut only_right };
        for _ in 0..n.unsigned_abs() {
            target.push(id.to_string());
        }
    }
    (only_left, only_right)
}

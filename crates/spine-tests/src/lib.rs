//! Shared fixtures for the cross-crate test suites.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use spine_governance::{GateConfig, GovernanceGate, OverrideEnvironment};
use spine_intent::{InMemoryIntentStore, IntentLifecycle, LifecycleResult, StageRequest};
use spine_replay::{InMemoryLedger, RunCapsule};
use spine_theory::{ClassifiedEvidence, TheoryResult};
use spine_types::{EvidenceChannel, IntentId, Lane};

pub const SESSION: &str = "sess-1";
pub const CLAIM: &str = "c1";
pub const SCOPE: &str = "sl-1";

/// Lifecycle and gate sharing one in-memory store.
pub struct Harness {
    pub store: Arc<InMemoryIntentStore>,
    pub lifecycle: IntentLifecycle,
    pub gate: GovernanceGate,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryIntentStore::new());
        Self {
            lifecycle: IntentLifecycle::new(store.clone()),
            gate: GovernanceGate::new(store.clone(), GateConfig::default())
                .with_environment(OverrideEnvironment::default()),
            store,
        }
    }

    /// Stage a grounded `create_proposition` and drive it to APPROVED.
    pub async fn approved_proposition(&self, scope: &str) -> LifecycleResult<IntentId> {
        let intent = self
            .lifecycle
            .stage(
                StageRequest::new("create_proposition", Lane::Grounded, proposition_payload())
                    .with_scope_lock(scope),
            )
            .await?;
        self.lifecycle
            .submit_for_review(&intent.intent_id, "orchestrator")
            .await?;
        self.lifecycle
            .approve(&intent.intent_id, "reviewer", "looks right")
            .await?;
        Ok(intent.intent_id)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn proposition_payload() -> Map<String, Value> {
    object(json!({"claim_id": CLAIM, "content": "the effect replicates"}))
}

/// Raw query-layer rows, mixing key spellings.
pub fn support_rows() -> Vec<Value> {
    vec![
        json!({"evidence_id": "ev-1", "claim_id": CLAIM, "scope_lock_id": SCOPE, "confidence": 0.9, "role": "support"}),
        json!({"evidence-id": "ev-2", "claim-id": CLAIM, "scope-lock-id": SCOPE, "confidence": 0.8, "role": "support"}),
    ]
}

pub fn support_evidence() -> TheoryResult<Vec<ClassifiedEvidence>> {
    ClassifiedEvidence::from_values(&support_rows(), EvidenceChannel::Validation)
}

/// Ledger holding every evidence id of `capsule` under its session and scope.
pub fn ledger_for(capsule: &RunCapsule) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    for id in &capsule.evidence_ids {
        ledger = ledger.with_evidence(&capsule.session_id, id, Some(CLAIM), capsule.scope_lock_id.as_deref());
    }
    for id in capsule.mutation_ids.iter().flatten() {
        ledger = ledger.with_mutation(&capsule.capsule_id, id);
    }
    if let Some(tenant) = &capsule.tenant_id {
        ledger = ledger.with_tenant(&capsule.capsule_id, tenant);
    }
    ledger
}

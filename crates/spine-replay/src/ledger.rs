use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReplayResult;

/// An evidence record as the ledger holds it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvidence {
    pub evidence_id: String,
    #[serde(default)]
    pub claim_id: Option<String>,
    #[serde(default)]
    pub scope_lock_id: Option<String>,
}

/// Read-only ledger queries used by replay.
///
/// Each lookup takes a bounded batch of ids; callers chunk.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Records among `evidence_ids` that the ledger links to `session_id`.
    async fn evidence_for_session(
        &self,
        session_id: &str,
        evidence_ids: &[String],
    ) -> ReplayResult<Vec<LedgerEvidence>>;

    /// Ids among `mutation_ids` asserted by `capsule_id`.
    async fn mutations_asserted_by(
        &self,
        capsule_id: &str,
        mutation_ids: &[String],
    ) -> ReplayResult<Vec<String>>;

    /// Tenant that owns `capsule_id`, if any.
    async fn capsule_tenant(&self, capsule_id: &str) -> ReplayResult<Option<String>>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct EvidenceEntry {
    session_id: String,
    #[serde(default)]
    claim_id: Option<String>,
    #[serde(default)]
    scope_lock_id: Option<String>,
}

/// Ledger snapshot held in memory, loadable from JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryLedger {
    evidence: BTreeMap<String, EvidenceEntry>,
    /// capsule id -> mutation ids it asserts.
    asserted_by: BTreeMap<String, BTreeSet<String>>,
    /// capsule id -> owning tenant.
    tenants: BTreeMap<String, String>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn with_evidence(
        mut self,
        session_id: &str,
        evidence_id: &str,
        claim_id: Option<&str>,
        scope_lock_id: Option<&str>,
    ) -> Self {
        self.evidence.insert(
            evidence_id.to_string(),
            EvidenceEntry {
                session_id: session_id.to_string(),
                claim_id: claim_id.map(str::to_string),
                scope_lock_id: scope_lock_id.map(str::to_string),
            },
        );
        self
    }

    pub fn with_mutation(mut self, capsule_id: &str, mutation_id: &str) -> Self {
        self.asserted_by
            .entry(capsule_id.to_string())
            .or_default()
            .insert(mutation_id.to_string());
        self
    }

    pub fn with_tenant(mut self, capsule_id: &str, tenant_id: &str) -> Self {
        self.tenants.insert(capsule_id.to_string(), tenant_id.to_string());
        self
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn evidence_for_session(
        &self,
        session_id: &str,
        evidence_ids: &[String],
    ) -> ReplayResult<Vec<LedgerEvidence>> {
        Ok(evidence_ids
            .iter()
            .filter_map(|id| {
                self.evidence
                    .get(id)
                    .filter(|e| e.session_id == session_id)
                    .map(|e| LedgerEvidence {
                        evidence_id: id.clone(),
                        claim_id: e.claim_id.clone(),
                        scope_lock_id: e.scope_lock_id.clone(),
                    })
            })
            .collect())
    }

    async fn mutations_asserted_by(
        &self,
        capsule_id: &str,
        mutation_ids: &[String],
    ) -> ReplayResult<Vec<String>> {
        let Some(linked) = self.asserted_by.get(capsule_id) else {
            return Ok(Vec::new());
        };
        Ok(mutation_ids
            .iter()
            .filter(|id| linked.contains(*id))
            .cloned()
            .collect())
    }

    async fn capsule_tenant(&self, capsule_id: &str) -> ReplayResult<Option<String>> {
        Ok(self.tenants.get(capsule_id).cloned())
    }
}

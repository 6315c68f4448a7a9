use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use spine_fingerprint::{
    make_capsule_manifest_hash, make_run_capsule_id, ManifestVersion, RunCapsuleInputs,
};
use spine_governance::{GovernanceSummary, GATE_CODE_PASS};

use crate::error::{ReplayError, ReplayResult};

/// A sealed record of one governed run.
///
/// `mutation_ids` is `None` for capsules sealed before mutation snapshots
/// existed; such capsules hash as manifest v1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCapsule {
    pub capsule_id: String,
    pub session_id: String,
    pub query_hash: String,
    #[serde(default)]
    pub scope_lock_id: Option<String>,
    #[serde(default)]
    pub intent_id: Option<String>,
    #[serde(default)]
    pub proposal_id: Option<String>,
    #[serde(default)]
    pub evidence_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Manifest hash recorded at seal time.
    pub capsule_hash: String,
}

impl RunCapsule {
    /// Seal a STAGED governance summary that passed every coherence check.
    ///
    /// Summaries staged through a policy override are refused.
    pub fn seal(
        summary: &GovernanceSummary,
        query_hash: &str,
        tenant_id: Option<&str>,
    ) -> ReplayResult<Self> {
        if !summary.is_staged() {
            return Err(ReplayError::Unsealable(format!(
                "governance status is {}",
                summary.status
            )));
        }
        if summary.policy_override.is_some() || summary.gate_code != GATE_CODE_PASS {
            return Err(ReplayError::Unsealable(format!(
                "run was staged by override (gate_code {}); only coherent runs are sealed",
                summary.gate_code
            )));
        }
        let session_id = summary
            .session_id
            .clone()
            .ok_or_else(|| ReplayError::Unsealable("summary has no session id".into()))?;

        let scope_lock_id = summary.scope_lock_id.as_ref().map(|s| s.to_string());
        let intent_id = summary.intent_id.as_ref().map(|s| s.to_string());
        let proposal_id = summary.proposal_id.as_ref().map(|s| s.to_string());
        let mut evidence_ids = summary.persisted_evidence_ids.clone();
        evidence_ids.sort();
        let mut mutation_ids = summary.mutation_ids.clone();
        mutation_ids.sort();

        let capsule_id = make_run_capsule_id(&RunCapsuleInputs {
            session_id: &session_id,
            query_hash,
            scope_lock_id: scope_lock_id.as_deref(),
            intent_id: intent_id.as_deref(),
            proposal_id: proposal_id.as_deref(),
            evidence_ids: &evidence_ids,
        });

        let mut capsule = Self {
            capsule_id,
            session_id,
            query_hash: query_hash.to_string(),
            scope_lock_id,
            intent_id,
            proposal_id,
            evidence_ids,
            mutation_ids: Some(mutation_ids),
            tenant_id: tenant_id.map(str::to_string),
            capsule_hash: String::new(),
        };
        capsule.capsule_hash = capsule.compute_hash(&capsule.capsule_id);
        Ok(capsule)
    }

    /// Hashable manifest. Absent v1 fields hash as empty strings; list
    /// fields are sorted.
    pub fn to_manifest(&self) -> Map<String, Value> {
        let mut evidence_ids = self.evidence_ids.clone();
        evidence_ids.sort();

        let mut manifest = Map::new();
        manifest.insert("session_id".into(), json!(self.session_id));
        manifest.insert("query_hash".into(), json!(self.query_hash));
        manifest.insert("scope_lock_id".into(), json!(self.scope_lock_id.as_deref().unwrap_or("")));
        manifest.insert("intent_id".into(), json!(self.intent_id.as_deref().unwrap_or("")));
        manifest.insert("proposal_id".into(), json!(self.proposal_id.as_deref().unwrap_or("")));
        manifest.insert("evidence_ids".into(), json!(evidence_ids));
        if let Some(ids) = &self.mutation_ids {
            let mut ids = ids.clone();
            ids.sort();
            manifest.insert("mutation_ids".into(), json!(ids));
        }
        if let Some(tenant) = &self.tenant_id {
            manifest.insert("tenant_id".into(), json!(tenant));
        }
        manifest
    }

    pub fn manifest_version(&self) -> ManifestVersion {
        ManifestVersion::detect(&self.to_manifest())
    }

    /// Recompute the manifest hash under `capsule_id`.
    pub fn compute_hash(&self, capsule_id: &str) -> String {
        let manifest = self.to_manifest();
        let version = ManifestVersion::detect(&manifest);
        make_capsule_manifest_hash(capsule_id, &manifest, version)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> ReplayResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spine_governance::{GateInput, GateStatus};
    use spine_types::{IntentId, ProposalId};

    fn staged_summary() -> GovernanceSummary {
        let input = GateInput::new("s1")
            .with_evidence(["ev-2", "ev-1"])
            .with_intent(IntentId::from("intent_a"), Some(ProposalId::from("prop-a")))
            .with_scope_lock("sl-1");
        let mut summary: GovernanceSummary = serde_json::from_value(json!({
            "contract_version": "v1",
            "status": "STAGED",
            "lane": "grounded",
            "session_id": input.session_id,
            "persisted_evidence_ids": input.persisted_evidence_ids,
            "intent_id": input.intent_id,
            "proposal_id": input.proposal_id,
            "mutation_ids": [],
            "scope_lock_id": input.scope_lock_id,
            "hold_code": null,
            "hold_reason": null,
            "gate_code": "PASS",
            "failure_reason": null,
            "duration_ms": 0
        }))
        .unwrap();
        summary.mutation_ids = vec!["mut-2".into(), "mut-1".into()];
        summary
    }

    #[test]
    fn seal_is_deterministic_and_self_consistent() {
        let a = RunCapsule::seal(&staged_summary(), "qh", None).unwrap();
        let b = RunCapsule::seal(&staged_summary(), "qh", None).unwrap();
        assert_eq!(a, b);
        assert!(a.capsule_id.starts_with("run-"));
        assert_eq!(a.evidence_ids, vec!["ev-1".to_string(), "ev-2".into()]);
        assert_eq!(a.capsule_hash, a.compute_hash(&a.capsule_id));
        assert_eq!(a.manifest_version(), ManifestVersion::V2);
    }

    #[test]
    fn tenant_selects_v3() {
        let c = RunCapsule::seal(&staged_summary(), "qh", Some("tenant-a")).unwrap();
        assert_eq!(c.manifest_version(), ManifestVersion::V3);
        let untenanted = RunCapsule::seal(&staged_summary(), "qh", None).unwrap();
        assert_ne!(c.capsule_hash, untenanted.capsule_hash);
    }

    #[test]
    fn legacy_capsule_hashes_as_v1() {
        let mut c = RunCapsule::seal(&staged_summary(), "qh", None).unwrap();
        c.mutation_ids = None;
        assert_eq!(c.manifest_version(), ManifestVersion::V1);
    }

    #[test]
    fn hold_summaries_cannot_be_sealed() {
        let mut s = staged_summary();
        s.status = GateStatus::Hold;
        assert!(matches!(
            RunCapsule::seal(&s, "qh", None),
            Err(ReplayError::Unsealable(_))
        ));
    }

    #[test]
    fn overridden_summaries_cannot_be_sealed() {
        let mut s = staged_summary();
        s.gate_code = "UNSAFE_BYPASS".into();
        s.persisted_evidence_ids.clear();
        s.hold_reason = Some("No evidence was persisted for this session".into());
        s.policy_override = Some(
            serde_json::from_value(json!({
                "reason": "local development override",
                "overridden_code": "NO_EVIDENCE_PERSISTED",
                "granted_at": "2026-01-01T00:00:00Z"
            }))
            .unwrap(),
        );
        let err = RunCapsule::seal(&s, "qh", None).unwrap_err();
        assert!(matches!(err, ReplayError::Unsealable(ref m) if m.contains("UNSAFE_BYPASS")));

        // Either marker alone is enough to refuse.
        let mut code_only = staged_summary();
        code_only.gate_code = "UNSAFE_BYPASS".into();
        assert!(RunCapsule::seal(&code_only, "qh", None).is_err());

        let mut override_only = staged_summary();
        override_only.policy_override = s.policy_override.clone();
        assert!(RunCapsule::seal(&override_only, "qh", None).is_err());
    }

    #[test]
    fn load_reads_sealed_json() {
        let c = RunCapsule::seal(&staged_summary(), "qh", None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capsule.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&c).unwrap()).unwrap();
        assert_eq!(RunCapsule::load(&path).unwrap(), c);
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::capsule::RunCapsule;
use crate::config::ReplayConfig;
use crate::ledger::LedgerReader;
use crate::verdict::{
    HashCheck, LinkageCheck, PrimacyCheck, ReplayCode, ReplayDetails, ReplayStatus, ReplayVerdict,
    TenantCheck, CONTRACT_VERSION,
};

fn short(hash: &str) -> String {
    hash.chars().take(12).collect()
}

/// Read-only verifier for sealed run capsules.
///
/// Holds only a [`LedgerReader`], so it has no path to any write.
pub struct CapsuleReplayVerifier {
    ledger: Arc<dyn LedgerReader>,
    config: ReplayConfig,
}

impl CapsuleReplayVerifier {
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self {
            ledger,
            config: ReplayConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Verify `capsule` under its own id.
    pub async fn verify(&self, capsule: &RunCapsule, tenant_id: Option<&str>) -> ReplayVerdict {
        self.verify_capsule(&capsule.capsule_id, capsule, tenant_id).await
    }

    /// Run every check and collect all failures.
    pub async fn verify_capsule(
        &self,
        capsule_id: &str,
        capsule: &RunCapsule,
        tenant_id: Option<&str>,
    ) -> ReplayVerdict {
        let mut reasons = Vec::new();
        let mut codes = Vec::new();

        let hash_integrity = check_hash(capsule_id, capsule);
        if hash_integrity.expected != hash_integrity.computed {
            reasons.push(format!(
                "Manifest hash mismatch (expected {}…, got {}…)",
                short(&hash_integrity.expected),
                short(&hash_integrity.computed)
            ));
            codes.push(ReplayCode::HashMismatch);
        }

        let (primacy, primacy_reason) = self.check_primacy(capsule).await;
        if let (Some(code), Some(reason)) = (primacy.code, primacy_reason) {
            reasons.push(format!("Primacy check failed: [{code}] {reason}"));
            codes.push(code);
        }

        let mutation_ids = capsule.mutation_ids.as_deref().unwrap_or_default();
        let mutation_linkage = self.check_mutations(capsule_id, mutation_ids).await;
        if !mutation_linkage.missing.is_empty() {
            reasons.push(format!("Mutation linkage failed: {:?}", mutation_linkage.missing));
            codes.push(if mutation_linkage.error.is_some() {
                ReplayCode::LedgerUnavailable
            } else {
                ReplayCode::MutationLinkageMissing
            });
        }

        let tenant_scope = match tenant_id {
            Some(tenant) => {
                let (check, reason) = self.check_tenant(capsule_id, tenant).await;
                if let (Some(code), Some(reason)) = (check.code, reason) {
                    reasons.push(format!("Tenant scope failed: [{code}] {reason}"));
                    codes.push(code);
                }
                Some(check)
            }
            None => None,
        };

        let mut seen = BTreeSet::new();
        codes.retain(|c| seen.insert(c.as_str()));

        let status = if reasons.is_empty() {
            ReplayStatus::Pass
        } else {
            ReplayStatus::Fail
        };
        if status == ReplayStatus::Fail {
            warn!(
                capsule_id,
                codes = ?codes.iter().map(ReplayCode::as_str).collect::<Vec<_>>(),
                "capsule replay FAIL"
            );
        } else {
            info!(capsule_id, "capsule replay PASS");
        }

        ReplayVerdict {
            contract_version: CONTRACT_VERSION.to_string(),
            status,
            reasons,
            codes,
            details: ReplayDetails {
                hash_integrity,
                primacy,
                mutation_linkage,
                tenant_scope,
            },
        }
    }

    /// Every claimed evidence id must be linked to the capsule's session and,
    /// when the capsule has one, carry its scope lock.
    async fn check_primacy(&self, capsule: &RunCapsule) -> (PrimacyCheck, Option<String>) {
        let mut check = PrimacyCheck::default();
        let fail = |mut check: PrimacyCheck, code, reason: String| {
            check.code = Some(code);
            (check, Some(reason))
        };

        if capsule.evidence_ids.is_empty() {
            return fail(check, ReplayCode::EvidenceMissingFromLedger, "No evidence IDs to verify".into());
        }
        if capsule.session_id.trim().is_empty() {
            return fail(check, ReplayCode::EvidenceMissingFromLedger, "No session_id provided".into());
        }

        let wanted: Vec<String> = capsule
            .evidence_ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut found: BTreeMap<String, Option<String>> = BTreeMap::new();
        for chunk in wanted.chunks(self.config.chunk_size()) {
            match self.ledger.evidence_for_session(&capsule.session_id, chunk).await {
                Ok(rows) => {
                    for row in rows {
                        found.insert(row.evidence_id, row.scope_lock_id);
                    }
                }
                Err(err) => {
                    check.error = Some(err.to_string());
                    return fail(check, ReplayCode::LedgerUnavailable, format!("Ledger lookup failed: {err}"));
                }
            }
        }
        check.verified_count = found.len();

        check.missing = wanted.iter().filter(|id| !found.contains_key(*id)).cloned().collect();
        if !check.missing.is_empty() {
            let reason = format!(
                "{} evidence ID(s) not found in ledger for session {}",
                check.missing.len(),
                capsule.session_id
            );
            return fail(check, ReplayCode::EvidenceMissingFromLedger, reason);
        }

        if let Some(expected) = capsule.scope_lock_id.as_deref().filter(|s| !s.is_empty()) {
            check.mismatched = found
                .iter()
                .filter_map(|(id, scope)| match scope.as_deref() {
                    Some(s) if s != expected => Some((id.clone(), s.to_string())),
                    _ => None,
                })
                .collect();
            if !check.mismatched.is_empty() {
                let reason = format!(
                    "{} evidence ID(s) have wrong scope-lock-id (expected {expected})",
                    check.mismatched.len()
                );
                return fail(check, ReplayCode::EvidenceScopeMismatch, reason);
            }
        }
        (check, None)
    }

    /// Every manifest mutation id must be asserted by this capsule.
    async fn check_mutations(&self, capsule_id: &str, mutation_ids: &[String]) -> LinkageCheck {
        let mut check = LinkageCheck::default();
        if mutation_ids.is_empty() {
            return check;
        }
        let mut seen = BTreeSet::new();
        for chunk in mutation_ids.chunks(self.config.chunk_size()) {
            match self.ledger.mutations_asserted_by(capsule_id, chunk).await {
                Ok(linked) => seen.extend(linked),
                Err(err) => {
                    check.error = Some(err.to_string());
                    let mut all = mutation_ids.to_vec();
                    all.sort();
                    all.dedup();
                    check.missing = all;
                    return check;
                }
            }
        }
        check.verified_count = seen.len();
        let mut missing: Vec<String> = mutation_ids
            .iter()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        check.missing = missing;
        check
    }

    async fn check_tenant(&self, capsule_id: &str, tenant_id: &str) -> (TenantCheck, Option<String>) {
        let mut check = TenantCheck {
            code: None,
            expected_tenant: tenant_id.to_string(),
            found_tenant: None,
            error: None,
        };
        let reason = match self.ledger.capsule_tenant(capsule_id).await {
            Ok(Some(owner)) if owner == tenant_id => {
                check.found_tenant = Some(owner);
                return (check, None);
            }
            Ok(Some(owner)) => {
                check.code = Some(ReplayCode::TenantForbidden);
                let reason = format!("capsule {capsule_id} is not owned by tenant {tenant_id}");
                check.found_tenant = Some(owner);
                reason
            }
            Ok(None) => {
                check.code = Some(ReplayCode::TenantScopeMissing);
                format!("capsule {capsule_id} has no tenant ownership link")
            }
            Err(err) => {
                check.code = Some(ReplayCode::LedgerUnavailable);
                check.error = Some(err.to_string());
                format!("tenant lookup failed: {err}")
            }
        };
        (check, Some(reason))
    }
}

fn check_hash(capsule_id: &str, capsule: &RunCapsule) -> HashCheck {
    HashCheck {
        expected: capsule.capsule_hash.clone(),
        computed: capsule.compute_hash(capsule_id),
        manifest_version: capsule.manifest_version(),
    }
}

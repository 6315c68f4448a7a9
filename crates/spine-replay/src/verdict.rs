use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use spine_fingerprint::ManifestVersion;

pub const CONTRACT_VERSION: &str = "v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplayStatus {
    Pass,
    Fail,
}

impl ReplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayStatus::Pass => "PASS",
            ReplayStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for ReplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable replay failure codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplayCode {
    HashMismatch,
    EvidenceMissingFromLedger,
    EvidenceScopeMismatch,
    MutationLinkageMissing,
    TenantForbidden,
    TenantScopeMissing,
    LedgerUnavailable,
}

impl ReplayCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayCode::HashMismatch => "HASH_MISMATCH",
            ReplayCode::EvidenceMissingFromLedger => "EVIDENCE_MISSING_FROM_LEDGER",
            ReplayCode::EvidenceScopeMismatch => "EVIDENCE_SCOPE_MISMATCH",
            ReplayCode::MutationLinkageMissing => "MUTATION_LINKAGE_MISSING",
            ReplayCode::TenantForbidden => "TENANT_FORBIDDEN",
            ReplayCode::TenantScopeMissing => "TENANT_SCOPE_MISSING",
            ReplayCode::LedgerUnavailable => "LEDGER_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ReplayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCheck {
    /// Hash stored on the capsule.
    pub expected: String,
    pub computed: String,
    pub manifest_version: ManifestVersion,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimacyCheck {
    pub code: Option<ReplayCode>,
    pub verified_count: usize,
    pub missing: Vec<String>,
    /// evidence id -> scope lock found in the ledger.
    pub mismatched: BTreeMap<String, String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkageCheck {
    pub verified_count: usize,
    pub missing: Vec<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCheck {
    pub code: Option<ReplayCode>,
    pub expected_tenant: String,
    pub found_tenant: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDetails {
    pub hash_integrity: HashCheck,
    pub primacy: PrimacyCheck,
    pub mutation_linkage: LinkageCheck,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_scope: Option<TenantCheck>,
}

/// Outcome of replaying one capsule. FAIL carries every failing check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayVerdict {
    pub contract_version: String,
    pub status: ReplayStatus,
    pub reasons: Vec<String>,
    pub codes: Vec<ReplayCode>,
    pub details: ReplayDetails,
}

impl ReplayVerdict {
    pub fn passed(&self) -> bool {
        self.status == ReplayStatus::Pass
    }
}

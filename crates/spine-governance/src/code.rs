use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable HOLD codes. External tooling matches on these strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldCode {
    ProposalGenerationError,
    NoEvidencePersisted,
    NoIntentStaged,
    MissingCapsuleLinkage,
    IntentNotFound,
    IntentProposalMismatch,
    IntentEvidenceIdsMissing,
    EvidenceSetMismatch,
    ScopeLockMismatch,
    IntentStoreUnavailable,
}

impl HoldCode {
    pub const ALL: [HoldCode; 10] = [
        HoldCode::ProposalGenerationError,
        HoldCode::NoEvidencePersisted,
        HoldCode::NoIntentStaged,
        HoldCode::MissingCapsuleLinkage,
        HoldCode::IntentNotFound,
        HoldCode::IntentProposalMismatch,
        HoldCode::IntentEvidenceIdsMissing,
        HoldCode::EvidenceSetMismatch,
        HoldCode::ScopeLockMismatch,
        HoldCode::IntentStoreUnavailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HoldCode::ProposalGenerationError => "PROPOSAL_GENERATION_ERROR",
            HoldCode::NoEvidencePersisted => "NO_EVIDENCE_PERSISTED",
            HoldCode::NoIntentStaged => "NO_INTENT_STAGED",
            HoldCode::MissingCapsuleLinkage => "MISSING_CAPSULE_LINKAGE",
            HoldCode::IntentNotFound => "INTENT_NOT_FOUND",
            HoldCode::IntentProposalMismatch => "INTENT_PROPOSAL_MISMATCH",
            HoldCode::IntentEvidenceIdsMissing => "INTENT_EVIDENCE_IDS_MISSING",
            HoldCode::EvidenceSetMismatch => "EVIDENCE_SET_MISMATCH",
            HoldCode::ScopeLockMismatch => "SCOPE_LOCK_MISMATCH",
            HoldCode::IntentStoreUnavailable => "INTENT_STORE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for HoldCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    Staged,
    Hold,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Staged => "STAGED",
            GateStatus::Hold => "HOLD",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_matches_as_str() {
        for code in HoldCode::ALL {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()));
        }
        assert_eq!(serde_json::to_string(&GateStatus::Staged).unwrap(), "\"STAGED\"");
    }
}

use serde::{Deserialize, Serialize};
use spine_fingerprint::{make_policy_hash, PolicyFingerprint};

use crate::error::{TheoryError, TheoryResult};

pub const FORK_THRESHOLD: f64 = 0.6;
pub const QUARANTINE_THRESHOLD: f64 = 0.8;
pub const MIN_EVIDENCE_COUNT: usize = 2;
pub const REPLICATE_WEIGHT: f64 = 0.5;
pub const OPERATOR_VERSION: &str = "1.0.0";

/// Tunable thresholds for theory-change decisions.
///
/// The values are heuristics. Every proposal records the hash of the policy
/// that produced it, so retuning is visible in proposal ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TheoryPolicy {
    /// Conflict score above which a competing hypothesis is forked.
    pub fork_threshold: f64,
    /// Undercut confidence above which a claim is quarantined.
    pub quarantine_threshold: f64,
    /// Evidence count below which the operator always holds.
    pub min_evidence_count: usize,
    /// Weight of one replication relative to direct evidence.
    pub replicate_weight: f64,
    pub operator_version: String,
}

impl Default for TheoryPolicy {
    fn default() -> Self {
        Self {
            fork_threshold: FORK_THRESHOLD,
            quarantine_threshold: QUARANTINE_THRESHOLD,
            min_evidence_count: MIN_EVIDENCE_COUNT,
            replicate_weight: REPLICATE_WEIGHT,
            operator_version: OPERATOR_VERSION.to_string(),
        }
    }
}

impl TheoryPolicy {
    pub fn validate(&self) -> TheoryResult<()> {
        for (name, v) in [
            ("fork_threshold", self.fork_threshold),
            ("quarantine_threshold", self.quarantine_threshold),
            ("replicate_weight", self.replicate_weight),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(TheoryError::InvalidPolicy(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }
        if self.min_evidence_count == 0 {
            return Err(TheoryError::InvalidPolicy(
                "min_evidence_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// 16-hex-char identifier of this policy version.
    pub fn policy_hash(&self) -> String {
        make_policy_hash(&PolicyFingerprint {
            fork_threshold: self.fork_threshold,
            quarantine_threshold: self.quarantine_threshold,
            min_evidence_count: self.min_evidence_count,
            replicate_weight: self.replicate_weight,
            operator_version: &self.operator_version,
        })
    }
}

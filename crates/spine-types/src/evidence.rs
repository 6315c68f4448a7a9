use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How a piece of evidence bears on a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceRole {
    Support,
    Refute,
    /// Attacks the validity of the method rather than the conclusion.
    Undercut,
    /// Replication attempt; success or failure is decided by channel.
    Replicate,
}

impl EvidenceRole {
    pub const ALL: [EvidenceRole; 4] = [
        EvidenceRole::Support,
        EvidenceRole::Refute,
        EvidenceRole::Undercut,
        EvidenceRole::Replicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceRole::Support => "support",
            EvidenceRole::Refute => "refute",
            EvidenceRole::Undercut => "undercut",
            EvidenceRole::Replicate => "replicate",
        }
    }
}

impl fmt::Display for EvidenceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceRole {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        EvidenceRole::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| TypeError::UnknownRole {
                value: s.to_string(),
                valid: "support, refute, undercut, replicate".into(),
            })
    }
}

/// Channel an evidence row arrived through.
///
/// Channel separation is structural: the same inputs fingerprint differently
/// per channel, and replicate evidence is scored by channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceChannel {
    Validation,
    Negative,
}

impl EvidenceChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceChannel::Validation => "validation",
            EvidenceChannel::Negative => "negative",
        }
    }
}

impl fmt::Display for EvidenceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceChannel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "validation" => Ok(EvidenceChannel::Validation),
            "negative" => Ok(EvidenceChannel::Negative),
            _ => Err(TypeError::UnknownChannel(s.to_string())),
        }
    }
}

/// Classified failure of a negative-channel experiment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    NullEffect,
    SignFlip,
    ViolatedAssumption,
    Nonidentifiable,
}

impl FailureMode {
    pub const ALL: [FailureMode; 4] = [
        FailureMode::NullEffect,
        FailureMode::SignFlip,
        FailureMode::ViolatedAssumption,
        FailureMode::Nonidentifiable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureMode::NullEffect => "null_effect",
            FailureMode::SignFlip => "sign_flip",
            FailureMode::ViolatedAssumption => "violated_assumption",
            FailureMode::Nonidentifiable => "nonidentifiable",
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        FailureMode::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| TypeError::UnknownFailureMode {
                value: s.to_string(),
                valid: "null_effect, sign_flip, violated_assumption, nonidentifiable".into(),
            })
    }
}

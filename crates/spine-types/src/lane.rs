use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Epistemic lane a write intent travels in.
///
/// The lane is envelope metadata. It is never part of an intent payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Evidence-backed writes that can reach durable knowledge.
    Grounded,
    /// Exploratory writes that never promote to durable knowledge.
    Speculative,
}

impl Lane {
    pub const ALL: [Lane; 2] = [Lane::Grounded, Lane::Speculative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Grounded => "grounded",
            Lane::Speculative => "speculative",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lane {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grounded" => Ok(Lane::Grounded),
            "speculative" => Ok(Lane::Speculative),
            other => Err(TypeError::UnknownLane(other.to_string())),
        }
    }
}

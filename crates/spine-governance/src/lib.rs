//! Governance coherence gate.
//!
//! Runs a fail-fast ladder over a session's outcome and decides whether
//! its staged write intent may proceed (STAGED) or must stop (HOLD). The
//! coherence checks always read the canonical stored intent; a caller's
//! copy is never trusted.
//!
//! Ladder, first match wins:
//!
//! 1. upstream proposal error: `PROPOSAL_GENERATION_ERROR`
//! 2. no persisted evidence: `NO_EVIDENCE_PERSISTED`
//! 3. no staged intent: `NO_INTENT_STAGED`
//! 4. committed mutations without ids: `MISSING_CAPSULE_LINKAGE`
//! 5. stored intent coherence: `INTENT_NOT_FOUND`, `INTENT_PROPOSAL_MISMATCH`,
//!    `INTENT_EVIDENCE_IDS_MISSING`, `EVIDENCE_SET_MISMATCH`,
//!    `SCOPE_LOCK_MISMATCH` (and `INTENT_STORE_UNAVAILABLE` when the
//!    store cannot be read)

#![deny(unsafe_code)]

pub mod code;
pub mod config;
pub mod error;
pub mod gate;
pub mod override_policy;
pub mod summary;

pub use code::{GateStatus, HoldCode};
pub use config::GateConfig;
pub use error::{GovernanceError, GovernanceResult};
pub use gate::{check_intent, precheck, GovernanceGate, Hold};
pub use override_policy::{evaluate_override, OverrideEnvironment, PolicyOverride, CI_MARKERS};
pub use summary::{
    GateInput, GovernanceSummary, CONTRACT_VERSION, GATE_CODE_PASS, GATE_CODE_UNSAFE_BYPASS,
};

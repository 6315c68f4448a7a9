//! Capsule replay verification.
//!
//! A [`RunCapsule`] seals the outcome of a governed run. Replay recomputes
//! its manifest hash and re-queries the ledger for evidence primacy,
//! mutation linkage, and optionally tenant ownership. Every check runs, so a
//! FAIL verdict lists every problem at once. Verification only reads.

#![deny(unsafe_code)]

pub mod capsule;
pub mod config;
pub mod error;
pub mod ledger;
pub mod verdict;
pub mod verifier;

pub use capsule::RunCapsule;
pub use config::ReplayConfig;
pub use error::{ReplayError, ReplayResult};
pub use ledger::{InMemoryLedger, LedgerEvidence, LedgerReader};
pub use verdict::{
    HashCheck, LinkageCheck, PrimacyCheck, ReplayCode, ReplayDetails, ReplayStatus, ReplayVerdict,
    TenantCheck,
};
pub use verifier::CapsuleReplayVerifier;

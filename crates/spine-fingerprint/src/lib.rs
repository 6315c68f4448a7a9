//! Deterministic fingerprinting.
//!
//! Every function here is pure: canonical JSON in, SHA-256 out, with a
//! prefix naming the artifact kind. No I/O, no clock, no randomness.
//! Identical inputs produce identical ids across processes and releases,
//! which is what lets replay verification recompute them later.
//!
//! Channel separation is structural. A validation-channel evidence id and a
//! negative-channel evidence id built from the same inputs never collide,
//! because the prefix participates in the id.

#![deny(unsafe_code)]

pub mod digest;
pub mod ids;
pub mod manifest;

pub use ids::{
    evidence_fingerprint, make_capsule_id, make_channel_evidence_id, make_evidence_id,
    make_mutation_id, make_negative_evidence_id, make_policy_hash, make_proposal_id,
    make_run_capsule_id, PolicyFingerprint, RunCapsuleInputs,
};
pub use manifest::{make_capsule_manifest_hash, ManifestVersion};

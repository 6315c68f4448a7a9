//! Shared vocabulary for the constitutional spine.
//!
//! Every other spine crate speaks in these types: prefixed identifiers,
//! the envelope-level [`Lane`], the evidence role/channel vocabulary, and the
//! canonical JSON encoding that all fingerprints are computed over.

#![deny(unsafe_code)]

pub mod canonical;
pub mod error;
pub mod evidence;
pub mod ids;
pub mod lane;

pub use canonical::canonical_json;
pub use error::TypeError;
pub use evidence::{EvidenceChannel, EvidenceRole, FailureMode};
pub use ids::{ClaimId, EventId, IntentId, ProposalId, ScopeLockId, SessionId};
pub use lane::Lane;

//! Theory-change operator.
//!
//! Aggregates per-claim evidence by role and channel, scores conflict and
//! role entropy, and recommends REVISE, FORK, QUARANTINE, or HOLD. The
//! operator only emits proposals; staging and approval happen in
//! `spine-intent`.

#![deny(unsafe_code)]

pub mod aggregate;
pub mod error;
pub mod operator;
pub mod policy;
pub mod proposal;
pub mod row;

pub use aggregate::{
    aggregate_evidence, compute_conflict_score, compute_conflict_score_weighted,
    compute_entropy_proxy, EvidenceAggregate,
};
pub use error::{TheoryError, TheoryResult};
pub use operator::{compute_theory_change_action, ActionDecision, TheoryAction, TheoryOperator};
pub use policy::TheoryPolicy;
pub use proposal::{generate_proposal, TheoryChangeProposal, PROPOSAL_INTENT_TYPE};
pub use row::{clamp_probability, ClassifiedEvidence, EvidenceRow};

//! Write-intent lifecycle.
//!
//! Proposed mutations to durable knowledge are staged as [`WriteIntent`]s,
//! routed through review, and executed only after a literal approval event
//! exists in their append-only history.
//!
//! ## Invariants
//!
//! - Terminal statuses (rejected, cancelled, expired, executed, failed) have
//!   no outgoing transitions.
//! - EXECUTED is reachable only from APPROVED, and only when the history
//!   holds an `approved` event. A status snapshot is not proof.
//! - Every transition appends exactly one [`IntentStatusEvent`]; the status
//!   compare-and-set and the append are one atomic store operation.
//! - `stage()` validation failures persist nothing.
//! - A batch spanning more than one scope lock executes nothing.
//!
//! ## States
//!
//! ```text
//! STAGED         -> AWAITING_HITL | CANCELLED
//! AWAITING_HITL  -> APPROVED | REJECTED | DEFERRED | CANCELLED | EXPIRED
//! APPROVED       -> EXECUTED | FAILED          (batch hold: -> DEFERRED)
//! DEFERRED       -> AWAITING_HITL | EXPIRED
//! ```

#![deny(unsafe_code)]

pub mod batch;
pub mod capability;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod registry;
pub mod store;

pub use batch::{BatchFailure, BatchOutcome};
pub use capability::{MutationWriter, WriteCapability};
pub use config::LifecycleConfig;
pub use error::{
    IntentTransitionError, LifecycleError, LifecycleResult, StoreError, StoreResult,
    TransitionDenial, ValidationError,
};
pub use lifecycle::{ExecutionReceipt, IntentLifecycle};
pub use model::{ActorType, IntentStatus, IntentStatusEvent, StageRequest, WriteIntent};
pub use registry::{ApprovalPolicy, IntentRegistry, IntentSpec, ScopeLockPolicy};
pub use store::{FileIntentStore, InMemoryIntentStore, IntentFilter, IntentStore};

use spine_types::{IntentId, Lane};
use thiserror::Error;

use crate::model::IntentStatus;

pub type StoreResult<T> = Result<T, StoreError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Persistence-layer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// Duplicate insert, or a compare-and-set that lost the race.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// A payload or policy violation, raised before anything is persisted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown intent type: {0}")]
    UnknownIntentType(String),

    #[error("'lane' must not appear in the payload of {intent_type}; lane is envelope metadata")]
    LaneInPayload { intent_type: String },

    #[error("lane {lane} not allowed for {intent_type} (allowed: {allowed})")]
    LaneNotAllowed {
        intent_type: String,
        lane: Lane,
        allowed: String,
    },

    #[error("missing required fields for {intent_type}: {}", .fields.join(", "))]
    MissingFields {
        intent_type: String,
        fields: Vec<String>,
    },

    #[error("unknown fields for {intent_type}: {}", .fields.join(", "))]
    UnknownFields {
        intent_type: String,
        fields: Vec<String>,
    },

    #[error("id fields must be non-empty strings for {intent_type}: {}", .fields.join(", "))]
    BlankIdFields {
        intent_type: String,
        fields: Vec<String>,
    },

    #[error("approval policy denies {intent_type} in lane {lane}")]
    ApprovalDenied { intent_type: String, lane: Lane },

    #[error("scope lock required for {intent_type} in lane {lane}")]
    ScopeLockRequired { intent_type: String, lane: Lane },

    #[error("scope lock forbidden for {intent_type} in lane {lane}")]
    ScopeLockForbidden { intent_type: String, lane: Lane },

    #[error("impact score must be a finite value in [0, 1], got {0}")]
    InvalidImpactScore(f64),
}

impl ValidationError {
    pub fn is_scope_lock_required(&self) -> bool {
        matches!(self, ValidationError::ScopeLockRequired { .. })
    }
}

/// Why a transition on a persisted intent was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDenial {
    /// Not an edge of the state machine.
    NotAllowed,
    /// Execution requested but the history holds no approved event.
    MissingApproval,
    /// Another caller moved the intent first.
    StatusChanged { actual: IntentStatus },
}

impl std::fmt::Display for TransitionDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionDenial::NotAllowed => f.write_str("transition not allowed"),
            TransitionDenial::MissingApproval => f.write_str("no approved event in history"),
            TransitionDenial::StatusChanged { actual } => {
                write!(f, "status changed concurrently to {actual}")
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("intent {intent_id}: {from} -> {to} refused: {reason}")]
pub struct IntentTransitionError {
    pub intent_id: IntentId,
    pub from: IntentStatus,
    pub to: IntentStatus,
    pub reason: TransitionDenial,
}

/// Errors from lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] IntentTransitionError),

    #[error("intent not found: {0}")]
    NotFound(IntentId),

    #[error("mutation writer failed: {0}")]
    Mutation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn is_scope_lock_required(&self) -> bool {
        matches!(self, LifecycleError::Validation(v) if v.is_scope_lock_required())
    }
}

use spine_types::TypeError;
use thiserror::Error;

pub type TheoryResult<T> = Result<T, TheoryError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TheoryError {
    #[error("{field} must be finite, got {value}")]
    NonFiniteConfidence { field: &'static str, value: f64 },

    #[error("{field} is not numeric: {value}")]
    NonNumericConfidence { field: &'static str, value: String },

    #[error("evidence row {index} has no evidence id")]
    MissingEvidenceId { index: usize },

    #[error("evidence row {index} repeats evidence id {evidence_id}")]
    DuplicateEvidenceId { index: usize, evidence_id: String },

    #[error("evidence row {index} has no role")]
    MissingRole { index: usize },

    #[error("evidence row {index} belongs to claim {found}, expected {expected}")]
    ClaimMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("evidence row is not a JSON object")]
    NotAnObject,

    #[error("invalid theory policy: {0}")]
    InvalidPolicy(String),

    #[error(transparent)]
    Vocabulary(#[from] TypeError),
}

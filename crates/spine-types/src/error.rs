use thiserror::Error;

/// Errors raised while parsing shared vocabulary from untyped input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown lane '{0}' (expected grounded or speculative)")]
    UnknownLane(String),

    #[error("invalid evidence role '{value}' (valid roles: {valid})")]
    UnknownRole { value: String, valid: String },

    #[error("invalid evidence channel '{0}' (expected validation or negative)")]
    UnknownChannel(String),

    #[error("invalid failure mode '{value}' (valid modes: {valid})")]
    UnknownFailureMode { value: String, valid: String },
}

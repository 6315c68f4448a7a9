use thiserror::Error;

pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Errors raised while configuring or overriding the gate.
///
/// A HOLD verdict is never an error; it is a [`crate::GovernanceSummary`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("policy override denied: {0}")]
    OverrideDenied(String),

    #[error("invalid gate input: {0}")]
    InvalidInput(String),
}

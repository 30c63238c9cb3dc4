//! Gate error model.

use thiserror::Error;

/// Result type used across the gate.
pub type GateResult<T> = Result<T, GateError>;

/// Errors raised outside the token-validation path.
///
/// Token failures have their own closed type (`miniauth_auth::TokenError`)
/// because they never escape the decision engine as errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// A mutation body lacked a required key (e.g. `Id`).
    #[error("{0}")]
    MissingRequiredField(String),

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input was present but unusable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else; answered with a 500 at the request boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GateError {
    pub fn missing_field(msg: impl Into<String>) -> Self {
        Self::MissingRequiredField(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<serde_json::Error> for GateError {
    fn from(value: serde_json::Error) -> Self {
        Self::Validation(value.to_string())
    }
}

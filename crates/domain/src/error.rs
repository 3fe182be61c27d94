//! Domain error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the audit workflow services.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Bad or missing input. All violations are joined into one message.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The caller may not act on the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The resource is in a state that forbids the operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing, unknown or expired portal token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuditError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AuditError::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AuditError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AuditError::Forbidden(msg.into())
    }
}

pub type AuditResult<T> = Result<T, AuditError>;

//! Backend errors module

use thiserror::Error;

/// A request the backend refused because its input broke a business rule.
///
/// The reason is meant for operators and logs. Front doors that talk to
/// untrusted callers are expected to redact it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors returned by [`crate::Backend`] operations
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Backend failure: {reason}")]
    Internal { reason: String },
}

impl BackendError {
    /// Shorthand for a missing resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        BackendError::NotFound {
            resource: resource.into(),
        }
    }

    /// Shorthand for a validation failure
    pub fn invalid(reason: impl Into<String>) -> Self {
        BackendError::Validation(ValidationError::new(reason))
    }
}

//! Unified error types for the domain layer

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// # Example
    /// ```ignore
    /// if name.is_empty() {
    ///     return Err(DomainError::validation("World name is required"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid state transition error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    /// The human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::InvalidStateTransition(msg) => msg,
        }
    }
}

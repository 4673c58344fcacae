//! Domain-specific error types and error handling.

mod types;


// Re-export all error types
pub use types::TokenError;

use bc_shared::{error_codes, ErrorResponse};
use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DomainError {
    /// Returns the token error this wraps, if any
    pub fn as_token_error(&self) -> Option<&TokenError> {
        match self {
            DomainError::Token(err) => Some(err),
            _ => None,
        }
    }

    /// Shorthand for a storage failure raised by a store adapter
    pub fn storage(message: impl Into<String>) -> Self {
        DomainError::Token(TokenError::StorageFailure {
            message: message.into(),
        })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<DomainError> for ErrorResponse {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Token(token_err) => token_err.into(),
            DomainError::Validation { message } => {
                ErrorResponse::new(error_codes::VALIDATION_ERROR, message)
            }
            // Configuration and internal details stay in the logs
            DomainError::Configuration { .. } => ErrorResponse::new(
                error_codes::CONFIGURATION_ERROR,
                "Service misconfigured | الخدمة غير مهيأة بشكل صحيح",
            ),
            DomainError::Internal { .. } => ErrorResponse::new(
                error_codes::INTERNAL_ERROR,
                "Internal server error | خطأ داخلي في الخادم",
            ),
        }
    }
}

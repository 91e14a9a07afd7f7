//! Domain-specific error types and error handling.

mod types;

#[cfg(test)]
mod tests;

pub use types::{ConfigError, StoreError, TokenError, ValidationError};

use sg_shared::errors::{error_codes, ErrorResponse, IntoErrorResponse};
use thiserror::Error;

/// Generic message for every authentication failure; the reason never
/// leaves the service.
pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication required, please log in again";

/// Core domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether the caller may retry the operation
    ///
    /// Only transient store failures qualify. Cryptographic and replay
    /// failures never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Store(e) if e.is_transient())
    }

    /// Whether the error maps to "unauthenticated" at the API boundary
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, DomainError::Token(e) if !matches!(e, TokenError::TokenGenerationFailed))
    }

    /// Whether the error should be written to the security audit trail
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            DomainError::Token(
                TokenError::ReplayDetected { .. }
                    | TokenError::TokenRevoked
                    | TokenError::InvalidSignature
                    | TokenError::UnexpectedAlgorithm
                    | TokenError::IssuerMismatch
                    | TokenError::AudienceMismatch
            )
        )
    }

    /// HTTP status the transport layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            DomainError::Validation(_) => 400,
            DomainError::Token(TokenError::TokenGenerationFailed) => 500,
            DomainError::Token(_) => 401,
            DomainError::Store(e) if e.is_transient() => 503,
            DomainError::Store(_) => 500,
            DomainError::Config(_) | DomainError::Internal { .. } => 500,
        }
    }

    /// Stable error code for the API envelope
    pub fn error_code(&self) -> &'static str {
        match self.http_status() {
            400 => error_codes::VALIDATION_ERROR,
            401 => error_codes::UNAUTHORIZED,
            503 => error_codes::SERVICE_UNAVAILABLE,
            _ if matches!(self, DomainError::Config(_)) => error_codes::CONFIGURATION_ERROR,
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

impl IntoErrorResponse for DomainError {
    fn to_error_response(&self) -> ErrorResponse {
        let status = self.http_status();
        match self {
            // identical body for every auth failure, whatever the cause
            DomainError::Token(_) if status == 401 => {
                ErrorResponse::new(self.error_code(), UNAUTHENTICATED_MESSAGE, status)
            }
            DomainError::Validation(e) => {
                ErrorResponse::new(self.error_code(), e.to_string(), status)
            }
            DomainError::Store(_) if self.is_retryable() => ErrorResponse::new(
                self.error_code(),
                "Service temporarily unavailable, please retry",
                status,
            )
            .retryable(),
            _ => ErrorResponse::new(self.error_code(), "Internal server error", status),
        }
    }
}

//! Error kinds for configuration, input validation, token handling and the
//! key-value store.
//!
//! Every token failure maps to the same "unauthenticated" answer at the API
//! boundary; the variants only exist so that audit logging can tell them apart.

use thiserror::Error;

/// Startup configuration errors
///
/// These are fatal: a service that hits one must not accept traffic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Issuer must not be empty")]
    EmptyIssuer,

    #[error("Invalid lifetime for {name}: must be greater than zero and at most ten years")]
    InvalidTtl { name: String },

    #[error("Invalid leeway of {seconds}s: at most {max}s allowed")]
    InvalidLeeway { seconds: u64, max: u64 },

    #[error("Missing key path: {which}")]
    MissingKeyPath { which: String },

    #[error("Failed to read {which} key: {message}")]
    KeyRead { which: String, message: String },

    #[error("Failed to parse {which} key: {message}")]
    KeyParse { which: String, message: String },

    #[error("Public key does not belong to the private key")]
    KeyMismatch,

    #[error("Signing key too weak: {bits} bits (minimum {min})")]
    WeakKey { bits: usize, min: usize },
}

/// Input validation errors
///
/// These indicate a caller bug and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field required: {field}")]
    RequiredField { field: String },
}

impl ValidationError {
    /// Fails with `RequiredField` when `value` is empty
    pub fn require(field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::RequiredField {
                field: field.to_string(),
            });
        }
        Ok(())
    }
}

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Unexpected signing algorithm")]
    UnexpectedAlgorithm,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Token issuer mismatch")]
    IssuerMismatch,

    #[error("Token audience mismatch")]
    AudienceMismatch,

    #[error("Invalid token claims")]
    InvalidClaims,

    #[error("Token kind mismatch")]
    WrongTokenKind,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token replay detected for family {family_id}")]
    ReplayDetected { family_id: String },

    #[error("Token generation failed")]
    TokenGenerationFailed,
}

/// Key-value store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Store operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("Corrupted value at {key}: {message}")]
    Corrupted { key: String, message: String },
}

impl StoreError {
    /// Whether the failure is transient infrastructure trouble
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. } | StoreError::Timeout { .. })
    }
}

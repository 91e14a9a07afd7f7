//! Shared configuration and common types for SessionGuard
//!
//! This crate provides functionality used by every SessionGuard crate:
//! - Configuration types (token signing, Redis store, logging, environment)
//! - The API error envelope and error codes handed to the HTTP layer

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    CacheConfig, ConfigLoadError, Environment, LogFormat, LoggingConfig, SessionGuardConfig,
    TokenConfig,
};
pub use errors::{error_codes, ApiResult, ErrorResponse, IntoErrorResponse};

//! # SessionGuard Core
//!
//! Token-based session security: RS256 access tokens, single-use rotating
//! refresh secrets with replay detection, and an access-token deny-list.
//! All mutable state lives behind the [`KeyValueStore`] seam so any number
//! of processes can share one store.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;

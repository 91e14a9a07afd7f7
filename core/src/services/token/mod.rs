//! Token signing module
//!
//! This module handles the signed half of the session credentials:
//! - RS256 key loading with key-strength and key-pair checks
//! - Access token and signed refresh token minting
//! - Verification with algorithm, issuer and audience pinning
//! - Unverified claim peeking for bookkeeping

mod config;
mod key_manager;
mod signer;

#[cfg(test)]
pub(crate) mod tests;

pub use config::{
    max_token_ttl, TokenSignerConfig, MAX_LEEWAY_SECONDS, MAX_TOKEN_TTL_DAYS, MIN_RSA_KEY_BITS,
};
pub use key_manager::RsaKeyPair;
pub use signer::TokenSigner;

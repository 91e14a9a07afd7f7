//! Domain layer containing the token lifecycle entities.

pub mod entities;

// Re-export commonly used domain types
pub use entities::{
    Claims, IssuedToken, Principal, RefreshOutcome, RefreshTokenRecord, RequestOrigin,
    RevocationEntry, RotatedRefreshToken, SessionTokens, TokenKind,
};

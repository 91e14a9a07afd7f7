//! Domain entities for the token lifecycle.

pub mod refresh_token;
pub mod revocation;
pub mod session;
pub mod token;

// Re-export commonly used types
pub use refresh_token::{RefreshTokenRecord, RotatedRefreshToken};
pub use revocation::RevocationEntry;
pub use session::{Principal, RefreshOutcome, RequestOrigin, SessionTokens};
pub use token::{Claims, IssuedToken, TokenKind};

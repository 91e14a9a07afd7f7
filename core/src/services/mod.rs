//! Token lifecycle services.

pub mod refresh;
pub mod revocation;
pub mod session;
pub mod token;

// Re-export commonly used types
pub use refresh::{hash_secret, RefreshTokenStore};
pub use revocation::RevocationRegistry;
pub use session::SessionService;
pub use token::{RsaKeyPair, TokenSigner, TokenSignerConfig};

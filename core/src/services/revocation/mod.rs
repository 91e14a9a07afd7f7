//! Deny-list for access tokens revoked before their natural expiry

mod registry;


pub use registry::RevocationRegistry;

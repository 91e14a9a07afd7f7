//! Opaque refresh secrets with single-use rotation
//!
//! Each login starts a family; every refresh retires the presented secret
//! and issues its successor in the same family. Presenting a retired
//! secret again is treated as theft and kills the whole family.

mod store;

#[cfg(test)]
mod tests;

pub use store::{hash_secret, RefreshTokenStore, SECRET_BYTES};

//! Session lifecycle on top of the signer, the refresh store and the
//! revocation registry

mod service;

#[cfg(test)]
mod tests;

pub use service::SessionService;

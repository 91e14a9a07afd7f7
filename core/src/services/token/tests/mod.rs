//! Shared fixtures for token tests


use super::{RsaKeyPair, TokenSigner, TokenSignerConfig};

macro_rules! fixture {
    ($name:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $name))
    };
}

pub(crate) const PRIVATE_PKCS8: &str = fixture!("rsa4096_pkcs8_private.pem");
pub(crate) const PRIVATE_PKCS1: &str = fixture!("rsa4096_pkcs1_private.pem");
pub(crate) const PUBLIC_PKIX: &str = fixture!("rsa4096_public.pem");
pub(crate) const PUBLIC_PKCS1: &str = fixture!("rsa4096_pkcs1_public.pem");
pub(crate) const OTHER_PRIVATE: &str = fixture!("other4096_private.pem");
pub(crate) const OTHER_PUBLIC: &str = fixture!("other4096_public.pem");
pub(crate) const WEAK_PRIVATE: &str = fixture!("rsa2048_private.pem");
pub(crate) const WEAK_PUBLIC: &str = fixture!("rsa2048_public.pem");

pub(crate) fn key_pair() -> RsaKeyPair {
    RsaKeyPair::from_pem(PRIVATE_PKCS8.as_bytes(), PUBLIC_PKIX.as_bytes()).unwrap()
}

pub(crate) fn signer() -> TokenSigner {
    TokenSigner::new(TokenSignerConfig::default(), key_pair()).unwrap()
}

pub(crate) fn signer_with(config: TokenSignerConfig) -> TokenSigner {
    TokenSigner::new(config, key_pair()).unwrap()
}

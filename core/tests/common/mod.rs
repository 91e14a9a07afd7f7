//! Helpers shared by the core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use sg_core::{
    KeyNamespace, MemoryKeyValueStore, Principal, RequestOrigin, RsaKeyPair, SessionService,
    TokenSigner, TokenSignerConfig,
};

pub const PRIVATE_KEY: &str = include_str!("../fixtures/rsa4096_pkcs8_private.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/rsa4096_public.pem");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../fixtures/other4096_private.pem");
pub const WEAK_PRIVATE_KEY: &str = include_str!("../fixtures/rsa2048_private.pem");
pub const WEAK_PUBLIC_KEY: &str = include_str!("../fixtures/rsa2048_public.pem");

pub fn key_pair() -> RsaKeyPair {
    RsaKeyPair::from_pem(PRIVATE_KEY.as_bytes(), PUBLIC_KEY.as_bytes())
        .expect("fixture key pair")
}

pub fn signer() -> TokenSigner {
    TokenSigner::new(TokenSignerConfig::default(), key_pair()).expect("signer")
}

pub fn session_service() -> (Arc<MemoryKeyValueStore>, SessionService<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let service = SessionService::new(signer(), store.clone(), KeyNamespace::default())
        .expect("session service");
    (store, service)
}

pub fn principal() -> Principal {
    Principal::new("u1", "u1@example.com", "member")
}

pub fn origin() -> RequestOrigin {
    RequestOrigin::new("203.0.113.7", "agent/1.0")
}

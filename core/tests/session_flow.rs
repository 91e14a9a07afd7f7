//! End-to-end token lifecycle over the in-memory store
//!
//! Run with: cargo test -p sg_core --test session_flow

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use common::{origin, principal, session_service, signer};
use sg_core::{
    hash_secret, Claims, ConfigError, DomainError, KeyNamespace, MemoryKeyValueStore,
    RefreshTokenStore, RevocationRegistry, RsaKeyPair, TokenError, TokenKind, TokenSigner,
    TokenSignerConfig,
};

fn refresh_store() -> RefreshTokenStore<MemoryKeyValueStore> {
    RefreshTokenStore::new(
        Arc::new(MemoryKeyValueStore::new()),
        KeyNamespace::default(),
        Duration::days(7),
    )
    .unwrap()
}

fn token_error(err: DomainError) -> TokenError {
    match err {
        DomainError::Token(e) => e,
        other => panic!("expected token error, got {:?}", other),
    }
}

/// Access token verifies right after issue and can be revoked
#[tokio::test]
async fn test_issued_token_verifies_and_can_be_revoked() {
    let (store, _) = session_service();
    let signer = signer();
    let registry = RevocationRegistry::new(store, KeyNamespace::default());

    let issued = signer
        .issue_access_token("u1", "u1@example.com", "member", "session-1")
        .unwrap();
    assert_eq!(issued.expires_at() - issued.claims.issued_at(), Duration::minutes(15));

    let claims = signer.verify(&issued.token).unwrap();
    assert_eq!(claims.sub, "u1");

    registry
        .revoke(&claims.jti, claims.expires_at())
        .await
        .unwrap();
    assert!(registry.is_revoked(&claims.jti).await.unwrap());
}

/// Consuming R1, issuing R2 and replaying R1 kills R2
#[tokio::test]
async fn test_replay_revokes_family() {
    let store = refresh_store();

    let (r1, _) = store
        .issue("u1", "s1", "F1", None, &origin())
        .await
        .unwrap();
    let consumed = store.validate_and_consume(&r1).await.unwrap();
    assert_eq!(consumed.family_id, "F1");

    let (r2, record) = store
        .issue("u1", "s1", "F1", Some(&hash_secret(&r1)), &origin())
        .await
        .unwrap();
    assert_eq!(record.parent_hash, Some(hash_secret(&r1)));

    assert_eq!(
        token_error(store.validate(&r1).await.unwrap_err()),
        TokenError::ReplayDetected {
            family_id: "F1".to_string()
        }
    );
    assert!(store.validate(&r2).await.is_err());
}

/// A 2048-bit key fails at construction, not at verification
#[test]
fn test_weak_key_rejected_at_construction() {
    let weak = RsaKeyPair::from_pem(
        common::WEAK_PRIVATE_KEY.as_bytes(),
        common::WEAK_PUBLIC_KEY.as_bytes(),
    )
    .unwrap();

    let err = TokenSigner::new(TokenSignerConfig::default(), weak).unwrap_err();
    assert_eq!(
        err,
        DomainError::Config(ConfigError::WeakKey {
            bits: 2048,
            min: 4096
        })
    );
}

/// Concurrent consumers of one secret: exactly one winner, one live chain
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_rotation_has_single_winner() {
    let store = refresh_store();
    let (secret, _) = store
        .issue("u1", "s1", "F1", None, &origin())
        .await
        .unwrap();

    let barrier = Arc::new(tokio::sync::Barrier::new(32));
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let store = store.clone();
        let secret = secret.clone();
        let barrier = barrier.clone();
        tasks.spawn(async move {
            barrier.wait().await;
            store.rotate(&secret, &origin()).await
        });
    }

    let mut successors = Vec::new();
    let mut rejected = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(rotated) => successors.push(rotated.secret),
            Err(err) => {
                assert!(matches!(
                    token_error(err),
                    TokenError::ReplayDetected { .. } | TokenError::InvalidRefreshToken
                ));
                rejected += 1;
            }
        }
    }

    assert!(successors.len() <= 1);
    assert_eq!(successors.len() + rejected, 32);

    // losers revoked the family, so no successor chain survives the race
    for successor in successors {
        assert!(store.validate(&successor).await.is_err());
    }
}

/// Two tasks consuming the same secret: exactly one wins, repeatedly
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_racers_never_both_win() {
    for _ in 0..20 {
        let store = refresh_store();
        let (secret, _) = store
            .issue("u1", "s1", "F1", None, &origin())
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            tokio::spawn({
                let (store, secret) = (store.clone(), secret.clone());
                async move { store.validate_and_consume(&secret).await }
            }),
            tokio::spawn({
                let (store, secret) = (store.clone(), secret.clone());
                async move { store.validate_and_consume(&secret).await }
            }),
        );
        let wins = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|result| result.is_ok())
            .count();
        assert_eq!(wins, 1);
    }
}

/// Verifying an issued token returns the issued claims
#[test]
fn test_verify_roundtrips_claims() {
    let signer = signer();
    for (subject, role) in [("u1", "member"), ("u2", "admin"), ("service-7", "system")] {
        let issued = signer
            .issue_access_token(subject, "someone@example.com", role, "session-x")
            .unwrap();
        assert_eq!(signer.verify(&issued.token).unwrap(), issued.claims);
    }
}

/// Tokens from another key or algorithm are rejected
#[test]
fn test_foreign_algorithms_and_keys_rejected() {
    let signer = signer();
    let claims = Claims::new(
        TokenKind::Access,
        "u1",
        "u1@example.com",
        "member",
        "session-1",
        "session-guard",
        "session-guard-api",
        Duration::minutes(15),
    );

    let hs256 = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(common::PUBLIC_KEY.as_bytes()),
    )
    .unwrap();
    let ps256 = encode(
        &Header::new(Algorithm::PS256),
        &claims,
        &EncodingKey::from_rsa_pem(common::PRIVATE_KEY.as_bytes()).unwrap(),
    )
    .unwrap();
    let other_key = encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(common::OTHER_PRIVATE_KEY.as_bytes()).unwrap(),
    )
    .unwrap();

    assert_eq!(token_error(signer.verify(&hs256).unwrap_err()), TokenError::UnexpectedAlgorithm);
    assert_eq!(token_error(signer.verify(&ps256).unwrap_err()), TokenError::UnexpectedAlgorithm);
    assert_eq!(token_error(signer.verify(&other_key).unwrap_err()), TokenError::InvalidSignature);
}

/// A correctly signed token from another issuer is rejected
#[test]
fn test_foreign_issuer_rejected() {
    let foreign = TokenSigner::new(
        TokenSignerConfig {
            issuer: "another-issuer".to_string(),
            ..TokenSignerConfig::default()
        },
        common::key_pair(),
    )
    .unwrap();
    let issued = foreign
        .issue_access_token("u1", "u1@example.com", "member", "session-1")
        .unwrap();

    assert_eq!(
        token_error(signer().verify(&issued.token).unwrap_err()),
        TokenError::IssuerMismatch
    );
}

/// First consume wins, every later attempt is a replay
#[tokio::test]
async fn test_refresh_secret_is_single_use() {
    let store = refresh_store();
    let (secret, _) = store
        .issue("u1", "s1", "F1", None, &origin())
        .await
        .unwrap();
    let (sibling, _) = store
        .issue("u1", "s1", "F1", None, &origin())
        .await
        .unwrap();

    store.validate_and_consume(&secret).await.unwrap();
    assert!(matches!(
        token_error(store.validate(&secret).await.unwrap_err()),
        TokenError::ReplayDetected { .. }
    ));
    assert!(store.validate(&sibling).await.is_err());
}

/// Revocation entries expire with the token
#[tokio::test(start_paused = true)]
async fn test_revocation_entry_expires_with_token() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let registry = RevocationRegistry::new(store.clone(), KeyNamespace::default());

    registry
        .revoke("jti-1", Utc::now() + Duration::seconds(3))
        .await
        .unwrap();
    assert_eq!(registry.count().await.unwrap(), 1);

    tokio::time::advance(std::time::Duration::from_secs(5)).await;

    assert!(!registry.is_revoked("jti-1").await.unwrap());
    assert_eq!(registry.count().await.unwrap(), 0);
}

/// Two issues for the same subject and session differ
#[tokio::test]
async fn test_repeated_issues_are_unique() {
    let signer = signer();
    let a = signer
        .issue_access_token("u1", "u1@example.com", "member", "session-1")
        .unwrap();
    let b = signer
        .issue_access_token("u1", "u1@example.com", "member", "session-1")
        .unwrap();
    assert_ne!(a.token_id(), b.token_id());
    assert_ne!(a.token, b.token);

    let store = refresh_store();
    let (x, _) = store.issue("u1", "s1", "F1", None, &origin()).await.unwrap();
    let (y, _) = store.issue("u1", "s1", "F1", None, &origin()).await.unwrap();
    assert_ne!(x, y);
}

/// Full lifecycle through the session service
#[tokio::test]
async fn test_login_refresh_logout() {
    let (_, service) = session_service();

    let login = service.login(&principal(), &origin()).await.unwrap();
    service.authenticate(&login.access_token).await.unwrap();

    let refreshed = service
        .refresh(&login.refresh_token, &principal(), &origin())
        .await
        .unwrap();
    assert_eq!(refreshed.tokens.session_id, login.session_id);
    service
        .authenticate(&refreshed.tokens.access_token)
        .await
        .unwrap();

    service
        .logout(&refreshed.tokens.access_token, &refreshed.tokens.refresh_token)
        .await
        .unwrap();

    let err = service
        .authenticate(&refreshed.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(token_error(err.clone()), TokenError::TokenRevoked);
    assert_eq!(err.http_status(), 401);

    // the first access token is untouched by logout and expires on its own
    service.authenticate(&login.access_token).await.unwrap();
}

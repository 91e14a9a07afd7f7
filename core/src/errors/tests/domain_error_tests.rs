//! Unit tests for domain error types

use sg_shared::errors::IntoErrorResponse;

use crate::errors::{
    ConfigError, DomainError, StoreError, TokenError, ValidationError, UNAUTHENTICATED_MESSAGE,
};

#[test]
fn test_token_failures_share_one_response_body() {
    let failures = [
        TokenError::Malformed,
        TokenError::InvalidSignature,
        TokenError::TokenExpired,
        TokenError::IssuerMismatch,
        TokenError::TokenRevoked,
        TokenError::ReplayDetected {
            family_id: "family-1".to_string(),
        },
    ];

    let bodies: Vec<_> = failures
        .into_iter()
        .map(|e| DomainError::from(e).to_error_response())
        .collect();

    for body in &bodies {
        assert_eq!(body.status, 401);
        assert_eq!(body.error, "UNAUTHORIZED");
        assert_eq!(body.message, UNAUTHENTICATED_MESSAGE);
        assert!(body.details.is_none());
        assert!(!body.retryable);
    }
}

#[test]
fn test_replay_message_does_not_leak_into_response() {
    let error = DomainError::from(TokenError::ReplayDetected {
        family_id: "family-secret".to_string(),
    });
    assert!(error.to_string().contains("family-secret"));

    let response = error.to_error_response();
    assert!(!response.message.contains("family-secret"));
}

#[test]
fn test_store_unavailable_is_retryable_5xx() {
    let error = DomainError::from(StoreError::Unavailable {
        message: "connection refused".to_string(),
    });

    assert!(error.is_retryable());
    assert!(!error.is_unauthenticated());
    assert_eq!(error.http_status(), 503);

    let response = error.to_error_response();
    assert!(response.retryable);
    assert_eq!(response.error, "SERVICE_UNAVAILABLE");
}

#[test]
fn test_timeout_is_retryable() {
    let error = DomainError::from(StoreError::Timeout {
        operation: "get".to_string(),
    });
    assert!(error.is_retryable());
    assert_eq!(error.http_status(), 503);
}

#[test]
fn test_corrupted_value_is_not_retryable() {
    let error = DomainError::from(StoreError::Corrupted {
        key: "sg:refresh_token:abc".to_string(),
        message: "expected value".to_string(),
    });
    assert!(!error.is_retryable());
    assert_eq!(error.http_status(), 500);
}

#[test]
fn test_crypto_and_replay_failures_never_retryable() {
    for error in [
        TokenError::InvalidSignature,
        TokenError::UnexpectedAlgorithm,
        TokenError::ReplayDetected {
            family_id: "f".to_string(),
        },
    ] {
        let error = DomainError::from(error);
        assert!(!error.is_retryable());
        assert!(error.is_security_event());
    }
}

#[test]
fn test_expiry_is_not_a_security_event() {
    let error = DomainError::from(TokenError::TokenExpired);
    assert!(error.is_unauthenticated());
    assert!(!error.is_security_event());
}

#[test]
fn test_validation_error_is_bad_request() {
    let error = DomainError::from(ValidationError::RequiredField {
        field: "session_id".to_string(),
    });

    assert_eq!(error.http_status(), 400);
    let response = error.to_error_response();
    assert_eq!(response.error, "VALIDATION_ERROR");
    assert!(response.message.contains("session_id"));
}

#[test]
fn test_config_error_code() {
    let error = DomainError::from(ConfigError::WeakKey {
        bits: 2048,
        min: 4096,
    });
    assert_eq!(error.http_status(), 500);
    assert_eq!(error.error_code(), "CONFIGURATION_ERROR");
    assert!(error.to_string().contains("2048"));
}

#[test]
fn test_require_rejects_blank_values() {
    assert!(ValidationError::require("email", "user@example.com").is_ok());
    assert_eq!(
        ValidationError::require("email", "   "),
        Err(ValidationError::RequiredField {
            field: "email".to_string()
        })
    );
}

//! RS256 token minting and verification

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, Header, Validation};
use serde::Deserialize;

use crate::domain::entities::token::{Claims, IssuedToken, TokenKind};
use crate::errors::{DomainError, DomainResult, TokenError, ValidationError};

use super::config::TokenSignerConfig;
use super::key_manager::RsaKeyPair;

const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claims read by the unverified peek helpers
#[derive(Debug, Deserialize)]
struct PeekedClaims {
    jti: String,
    exp: i64,
}

/// Mints and verifies RS256 tokens
///
/// Pure: no I/O after construction and no interior mutability, so one
/// instance can be cloned into or shared across any number of tasks.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    config: TokenSignerConfig,
    keys: RsaKeyPair,
    validation: Validation,
}

impl TokenSigner {
    /// Creates a signer
    ///
    /// # Returns
    ///
    /// * `Ok(TokenSigner)` - Ready to issue and verify tokens
    /// * `Err(DomainError::Config)` - Empty issuer, non-positive lifetime, or
    ///   a key smaller than the configured floor (never below 4096 bits)
    pub fn new(config: TokenSignerConfig, keys: RsaKeyPair) -> DomainResult<Self> {
        config.validate()?;
        keys.ensure_strength(config.required_key_bits())?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "aud", "sub"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = config.leeway_seconds;

        tracing::info!(
            issuer = %config.issuer,
            key_bits = keys.key_bits(),
            access_ttl_secs = config.access_token_ttl.num_seconds(),
            refresh_ttl_secs = config.refresh_token_ttl.num_seconds(),
            "Token signer initialized"
        );

        Ok(Self {
            config,
            keys,
            validation,
        })
    }

    pub fn config(&self) -> &TokenSignerConfig {
        &self.config
    }

    /// Issues a short-lived access token
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedToken)` - Token with a fresh random `jti`
    /// * `Err(DomainError::Validation)` - An argument is empty
    pub fn issue_access_token(
        &self,
        subject_id: &str,
        email: &str,
        role: &str,
        session_id: &str,
    ) -> DomainResult<IssuedToken> {
        self.issue(TokenKind::Access, subject_id, email, role, session_id)
    }

    /// Issues a signed refresh-capable token
    ///
    /// Alternate refresh mode for clients that need a self-describing
    /// refresh credential. It carries no single-use guarantee; rotation
    /// and replay detection belong to the opaque refresh secrets of
    /// [`RefreshTokenStore`](crate::services::refresh::RefreshTokenStore).
    pub fn issue_refresh_token(
        &self,
        subject_id: &str,
        email: &str,
        role: &str,
        session_id: &str,
    ) -> DomainResult<IssuedToken> {
        self.issue(TokenKind::Refresh, subject_id, email, role, session_id)
    }

    fn issue(
        &self,
        kind: TokenKind,
        subject_id: &str,
        email: &str,
        role: &str,
        session_id: &str,
    ) -> DomainResult<IssuedToken> {
        ValidationError::require("subject_id", subject_id)?;
        ValidationError::require("email", email)?;
        ValidationError::require("role", role)?;
        ValidationError::require("session_id", session_id)?;

        let ttl = match kind {
            TokenKind::Access => self.config.access_token_ttl,
            TokenKind::Refresh => self.config.refresh_token_ttl,
        };
        let claims = Claims::new(
            kind,
            subject_id,
            email,
            role,
            session_id,
            &self.config.issuer,
            &self.config.audience,
            ttl,
        );

        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            self.keys.encoding_key(),
        )
        .map_err(|e| {
            tracing::error!(error = %e, kind = %kind, "Failed to sign token");
            DomainError::Token(TokenError::TokenGenerationFailed)
        })?;

        tracing::debug!(
            token_id = %claims.jti,
            session_id = %claims.sid,
            kind = %kind,
            "Token issued"
        );

        Ok(IssuedToken { token, claims })
    }

    /// Verifies a token of either kind and returns its claims
    ///
    /// Fails closed on malformed input, any algorithm other than RS256,
    /// a bad signature, expiry, `nbf` in the future, or an issuer or
    /// audience other than the configured ones.
    pub fn verify(&self, token: &str) -> DomainResult<Claims> {
        // checked before touching the signature: an HS256 token keyed with
        // the public key must never reach the verifier
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != SIGNING_ALGORITHM {
            tracing::warn!(alg = ?header.alg, "Rejected token with unexpected algorithm");
            return Err(TokenError::UnexpectedAlgorithm.into());
        }

        let data = decode::<Claims>(token, self.keys.decoding_key(), &self.validation)
            .map_err(|e| map_jwt_error(e.kind()))?;
        let claims = data.claims;

        if !claims.has_valid_lifetime()
            || claims.jti.is_empty()
            || claims.sub.is_empty()
            || claims.sid.is_empty()
        {
            return Err(TokenError::InvalidClaims.into());
        }

        Ok(claims)
    }

    /// Verifies a token and requires it to be an access token
    pub fn verify_access(&self, token: &str) -> DomainResult<Claims> {
        self.verify_kind(token, TokenKind::Access)
    }

    /// Verifies a token and requires it to be a signed refresh token
    pub fn verify_refresh(&self, token: &str) -> DomainResult<Claims> {
        self.verify_kind(token, TokenKind::Refresh)
    }

    fn verify_kind(&self, token: &str, expected: TokenKind) -> DomainResult<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != expected {
            tracing::warn!(
                token_id = %claims.jti,
                expected = %expected,
                actual = %claims.kind,
                "Token presented as the wrong kind"
            );
            return Err(TokenError::WrongTokenKind.into());
        }
        Ok(claims)
    }

    /// Reads `jti` WITHOUT checking the signature
    ///
    /// The result is attacker-controlled. Use it for bookkeeping such as
    /// deny-list pre-checks where authenticity is established elsewhere,
    /// never as a trust decision.
    pub fn peek_token_id(&self, token: &str) -> DomainResult<String> {
        Ok(peek(token)?.jti)
    }

    /// Reads `exp` WITHOUT checking the signature
    ///
    /// Same caveats as [`peek_token_id`](Self::peek_token_id).
    pub fn peek_expiry(&self, token: &str) -> DomainResult<DateTime<Utc>> {
        let exp = peek(token)?.exp;
        Utc.timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| TokenError::InvalidClaims.into())
    }
}

fn peek(token: &str) -> Result<PeekedClaims, TokenError> {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<PeekedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Malformed)
}

fn map_jwt_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::ImmatureSignature => TokenError::TokenNotYetValid,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnexpectedAlgorithm
        }
        ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
        ErrorKind::InvalidAudience => TokenError::AudienceMismatch,
        ErrorKind::MissingRequiredClaim(_) | ErrorKind::InvalidSubject => {
            TokenError::InvalidClaims
        }
        _ => TokenError::Malformed,
    }
}

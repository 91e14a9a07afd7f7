//! Signed token entities.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which credential a signed token stands for
///
/// Carried inside the signature so an access token can never be presented
/// where a refresh-capable token is expected, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims structure for JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal id)
    pub sub: String,

    /// Principal email
    pub email: String,

    /// Principal role
    pub role: String,

    /// Session the token belongs to
    pub sid: String,

    /// Access or refresh
    pub kind: TokenKind,

    /// JWT ID, the handle used for revocation lookups
    pub jti: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl Claims {
    /// Creates claims for a new token
    ///
    /// The token id is a fresh random UUID, so two tokens minted for the
    /// same principal and session in the same second still differ.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: TokenKind,
        subject_id: &str,
        email: &str,
        role: &str,
        session_id: &str,
        issuer: &str,
        audience: &str,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiry = now + ttl;

        Self {
            sub: subject_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            sid: session_id.to_string(),
            kind,
            jti: Uuid::new_v4().to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expiry.timestamp(),
        }
    }

    /// Subject id of the principal
    pub fn subject_id(&self) -> &str {
        &self.sub
    }

    /// Session id the token is bound to
    pub fn session_id(&self) -> &str {
        &self.sid
    }

    /// Expiration as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.exp)
    }

    /// Issue time as a timestamp
    pub fn issued_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.iat)
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// `exp` strictly after `iat`
    pub fn has_valid_lifetime(&self) -> bool {
        self.exp > self.iat
    }

    /// Time remaining until expiration, zero if already expired
    pub fn time_until_expiration(&self) -> Duration {
        let remaining = self.expires_at() - Utc::now();
        if remaining > Duration::zero() {
            remaining
        } else {
            Duration::zero()
        }
    }
}

/// A freshly minted token and the claims it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Compact JWS serialization
    pub token: String,
    /// Claims signed into the token
    pub claims: Claims,
}

impl IssuedToken {
    pub fn token_id(&self) -> &str {
        &self.claims.jti
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

fn timestamp_to_datetime(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access_claims() -> Claims {
        Claims::new(
            TokenKind::Access,
            "u1",
            "u1@example.com",
            "member",
            "session-1",
            "session-guard",
            "session-guard-api",
            Duration::minutes(15),
        )
    }

    #[test]
    fn test_new_claims() {
        let claims = access_claims();

        assert_eq!(claims.subject_id(), "u1");
        assert_eq!(claims.session_id(), "session-1");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.nbf, claims.iat);
        assert!(claims.has_valid_lifetime());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_token_ids_are_unique() {
        let a = access_claims();
        let b = access_claims();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_claims_expiration() {
        let mut claims = access_claims();
        claims.exp = Utc::now().timestamp() - 1;

        assert!(claims.is_expired());
        assert_eq!(claims.time_until_expiration(), Duration::zero());
    }

    #[test]
    fn test_time_until_expiration_bounded_by_ttl() {
        let claims = access_claims();
        let remaining = claims.time_until_expiration();
        assert!(remaining <= Duration::minutes(15));
        assert!(remaining > Duration::minutes(14));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_value(access_claims()).unwrap();
        assert_eq!(json["kind"], "access");
        assert_eq!(TokenKind::Refresh.to_string(), "refresh");
    }
}

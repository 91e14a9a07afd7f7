//! Refresh token record entity stored in the key-value store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata persisted for one opaque refresh secret
///
/// Keyed by the SHA-256 hash of the secret; the plaintext is never stored.
/// Records sharing a `family_id` form a chain through `parent_hash`, one
/// chain per login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Hex SHA-256 of the secret
    pub token_hash: String,

    /// Principal the token belongs to
    pub subject_id: String,

    /// Session the token refreshes
    pub session_id: String,

    /// Rotation lineage shared by every successor
    pub family_id: String,

    /// Hash of the token this one superseded, `None` for the chain head
    pub parent_hash: Option<String>,

    /// Timestamp when the token was issued
    pub issued_at: DateTime<Utc>,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,

    /// Client address at issuance
    pub origin_ip: String,

    /// Client user agent at issuance
    pub origin_user_agent: String,

    /// Set once, when the token is exchanged for a successor
    pub used: bool,
}

impl RefreshTokenRecord {
    /// Checks if the record has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Whether this record heads its family chain
    pub fn is_chain_head(&self) -> bool {
        self.parent_hash.is_none()
    }

    /// Gets the time remaining until expiration
    pub fn time_until_expiration(&self) -> Duration {
        let now = Utc::now();
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }

    /// Copy of the record with the `used` flag set
    pub fn consumed(&self) -> Self {
        Self {
            used: true,
            ..self.clone()
        }
    }
}

/// Result of exchanging a refresh secret for its successor
#[derive(Debug, Clone)]
pub struct RotatedRefreshToken {
    /// New plaintext secret; only ever returned here
    pub secret: String,
    /// Record persisted for the new secret
    pub record: RefreshTokenRecord,
    /// The superseded record, now marked used
    pub previous: RefreshTokenRecord,
    /// Request origin differs from where the previous token was issued
    pub anomaly: bool,
}

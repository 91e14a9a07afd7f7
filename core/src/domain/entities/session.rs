//! Session-level value types exchanged with the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated principal, as resolved by the identity layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject_id: String,
    pub email: String,
    pub role: String,
}

impl Principal {
    pub fn new(
        subject_id: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            role: role.into(),
        }
    }
}

/// Where a request came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrigin {
    pub ip: String,
    pub user_agent: String,
}

impl RequestOrigin {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Credentials handed to the client on login or refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Signed access token
    pub access_token: String,

    /// Opaque refresh secret
    pub refresh_token: String,

    pub session_id: String,

    pub family_id: String,

    pub access_expires_at: DateTime<Utc>,

    pub refresh_expires_at: DateTime<Utc>,
}

impl SessionTokens {
    /// Access token lifetime in seconds, for `expires_in` style responses
    pub fn access_expires_in(&self) -> i64 {
        (self.access_expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Result of a refresh
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub tokens: SessionTokens,
    /// Soft signal: the request origin drifted from the one the consumed
    /// refresh token was issued to. Callers decide on step-up friction.
    pub anomaly: bool,
}

//! Token signing configuration

use serde::{Deserialize, Serialize};

/// Default minimum RSA modulus size in bits for the signing key
pub const DEFAULT_MIN_KEY_BITS: usize = 4096;

/// Token signing configuration
///
/// Key material is referenced by path only; resolving secrets into those
/// files is the job of the deployment's secret provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Path to the PEM-encoded RSA private key (PKCS#1 or PKCS#8)
    pub private_key_path: String,

    /// Path to the PEM-encoded RSA public key (PKIX or PKCS#1)
    pub public_key_path: String,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    pub refresh_token_expiry: i64,

    /// Minimum accepted RSA key size in bits
    pub min_key_bits: usize,

    /// Clock skew tolerance applied to `exp`/`nbf` checks, in seconds
    pub leeway_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            private_key_path: String::from("keys/jwt_private_key.pem"),
            public_key_path: String::from("keys/jwt_public_key.pem"),
            issuer: String::from("session-guard"),
            audience: String::from("session-guard-api"),
            access_token_expiry: 900,     // 15 minutes
            refresh_token_expiry: 604800, // 7 days
            min_key_bits: DEFAULT_MIN_KEY_BITS,
            leeway_seconds: 0,
        }
    }
}

impl TokenConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            private_key_path: std::env::var("JWT_PRIVATE_KEY_PATH")
                .unwrap_or(defaults.private_key_path),
            public_key_path: std::env::var("JWT_PUBLIC_KEY_PATH")
                .unwrap_or(defaults.public_key_path),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            access_token_expiry: std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.access_token_expiry),
            refresh_token_expiry: std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_token_expiry),
            min_key_bits: std::env::var("JWT_MIN_KEY_BITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_key_bits),
            leeway_seconds: std::env::var("JWT_LEEWAY_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.leeway_seconds),
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Set the key file paths
    pub fn with_key_paths(
        mut self,
        private_key_path: impl Into<String>,
        public_key_path: impl Into<String>,
    ) -> Self {
        self.private_key_path = private_key_path.into();
        self.public_key_path = public_key_path.into();
        self
    }
}

//! Configuration for the token signer

use chrono::Duration;
use sg_shared::config::TokenConfig;

use crate::errors::ConfigError;

/// Smallest RSA modulus accepted for signing
pub const MIN_RSA_KEY_BITS: usize = 4096;

/// Longest lifetime accepted for any token, in days
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Longest lifetime accepted for any token
pub fn max_token_ttl() -> Duration {
    Duration::days(MAX_TOKEN_TTL_DAYS)
}

/// Largest clock-skew allowance accepted
pub const MAX_LEEWAY_SECONDS: u64 = 3600;

/// Seconds from configuration; out-of-range values saturate so that
/// [`TokenSignerConfig::validate`] rejects them
fn seconds(value: i64) -> Duration {
    Duration::try_seconds(value).unwrap_or_else(|| {
        if value < 0 {
            Duration::min_value()
        } else {
            Duration::max_value()
        }
    })
}

/// Configuration for the token signer
#[derive(Debug, Clone)]
pub struct TokenSignerConfig {
    /// Issuer written to and required from every token
    pub issuer: String,
    /// Audience written to and required from every token
    pub audience: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime, shared by signed refresh tokens and opaque
    /// refresh secrets
    pub refresh_token_ttl: Duration,
    /// Minimum RSA modulus size; values below 4096 are raised to 4096
    pub min_key_bits: usize,
    /// Clock skew tolerated on `exp` and `nbf`
    pub leeway_seconds: u64,
}

impl Default for TokenSignerConfig {
    fn default() -> Self {
        Self {
            issuer: "session-guard".to_string(),
            audience: "session-guard-api".to_string(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            min_key_bits: MIN_RSA_KEY_BITS,
            leeway_seconds: 0,
        }
    }
}

impl From<&TokenConfig> for TokenSignerConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_ttl: seconds(config.access_token_expiry),
            refresh_token_ttl: seconds(config.refresh_token_expiry),
            min_key_bits: config.min_key_bits,
            leeway_seconds: config.leeway_seconds,
        }
    }
}

impl TokenSignerConfig {
    /// Effective key floor
    pub fn required_key_bits(&self) -> usize {
        self.min_key_bits.max(MIN_RSA_KEY_BITS)
    }

    /// Reject settings the signer cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }
        check_ttl("access_token_ttl", self.access_token_ttl)?;
        check_ttl("refresh_token_ttl", self.refresh_token_ttl)?;
        if self.leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(ConfigError::InvalidLeeway {
                seconds: self.leeway_seconds,
                max: MAX_LEEWAY_SECONDS,
            });
        }
        Ok(())
    }
}

fn check_ttl(name: &str, ttl: Duration) -> Result<(), ConfigError> {
    if ttl <= Duration::zero() || ttl > max_token_ttl() {
        return Err(ConfigError::InvalidTtl {
            name: name.to_string(),
        });
    }
    Ok(())
}

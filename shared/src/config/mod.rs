//! Configuration module
//!
//! - `auth` - Token signing configuration (key paths, issuer, lifetimes)
//! - `cache` - Redis store configuration
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod environment;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::TokenConfig;
pub use cache::CacheConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Prefix for environment overrides applied on top of a configuration file
pub const ENV_OVERRIDE_PREFIX: &str = "SESSION_GUARD";

/// Errors raised while loading configuration sources
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to load configuration: {0}")]
    Source(#[from] ::config::ConfigError),
}

/// Complete SessionGuard configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionGuardConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Token signing configuration
    pub token: TokenConfig,

    /// Redis store configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl SessionGuardConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        Self {
            environment,
            token: TokenConfig::from_env(),
            cache: CacheConfig::from_env(),
            logging: LoggingConfig::from_env(environment),
        }
    }

    /// Load configuration from a file, with `SESSION_GUARD__*` environment
    /// variables overriding individual fields
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sg_shared::SessionGuardConfig;
    ///
    /// // SESSION_GUARD__TOKEN__ISSUER=auth.example.com overrides token.issuer
    /// let config = SessionGuardConfig::from_file("config/session-guard.toml").unwrap();
    /// println!("issuer: {}", config.token.issuer);
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let loaded = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(true))
            .add_source(
                ::config::Environment::with_prefix(ENV_OVERRIDE_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(loaded.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_consistent() {
        let config = SessionGuardConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.token.access_token_expiry, 900);
        assert_eq!(config.cache.key_prefix, "sg");
    }

    #[test]
    fn test_from_file_with_partial_sections() {
        let path = std::env::temp_dir().join(format!(
            "session-guard-config-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "environment = \"production\"\n\n[token]\nissuer = \"auth.example.com\"\naccess_token_expiry = 300\n\n[cache]\nkey_prefix = \"auth\""
        )
        .unwrap();

        let config = SessionGuardConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.token.issuer, "auth.example.com");
        assert_eq!(config.token.access_token_expiry, 300);
        // untouched fields keep their defaults
        assert_eq!(config.token.refresh_token_expiry, 604800);
        assert_eq!(config.cache.key_prefix, "auth");
    }

    #[test]
    fn test_from_missing_file_fails() {
        let result = SessionGuardConfig::from_file("/nonexistent/session-guard.toml");
        assert!(result.is_err());
    }
}

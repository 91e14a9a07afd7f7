//! # Infrastructure Layer
//!
//! This crate wires the SessionGuard core onto real infrastructure:
//!
//! - **Cache**: Redis client and the [`KeyValueStore`] implementation that
//!   holds refresh records, family indexes and the access-token deny-list
//! - **Telemetry**: tracing subscriber setup from [`LoggingConfig`]
//! - **Bootstrap**: loading keys and configuration into a ready
//!   [`SessionService`]
//!
//! [`LoggingConfig`]: sg_shared::config::LoggingConfig

use std::sync::Arc;

use sg_core::{
    DomainError, KeyNamespace, KeyValueStore, RsaKeyPair, SessionService, StoreError,
    TokenSigner, TokenSignerConfig,
};
use sg_shared::config::TokenConfig;
use sg_shared::SessionGuardConfig;

/// Cache module - Redis client and store
pub mod cache;

/// Telemetry module - tracing subscriber setup
pub mod telemetry;

pub use cache::{RedisClient, RedisKeyValueStore};
pub use telemetry::init_tracing;

/// Session service running on Redis
pub type RedisSessionService = SessionService<RedisKeyValueStore>;

/// Infrastructure service container
#[derive(Clone)]
pub struct InfrastructureServices {
    /// Shared Redis store
    pub store: Arc<RedisKeyValueStore>,
    /// Session lifecycle on top of the store
    pub sessions: RedisSessionService,
}

impl InfrastructureServices {
    /// Check backend connectivity
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        Ok(self.store.health_check().await.map_err(DomainError::from)?)
    }
}

/// Initialize infrastructure services
///
/// This function sets up:
/// - The RS256 signer from the configured key files
/// - The Redis connection
/// - The session service sharing both
pub async fn initialize(
    config: &SessionGuardConfig,
) -> Result<InfrastructureServices, InfrastructureError> {
    tracing::info!(environment = %config.environment, "Initializing infrastructure services...");

    let signer = build_signer(&config.token)?;
    let store = Arc::new(RedisKeyValueStore::new(&config.cache).await?);
    let keys = KeyNamespace::new(&config.cache.key_prefix);
    let sessions = SessionService::new(signer, Arc::clone(&store), keys)?;

    tracing::info!("Infrastructure services initialized successfully");

    Ok(InfrastructureServices { store, sessions })
}

/// Load keys and build the token signer
pub fn build_signer(config: &TokenConfig) -> Result<TokenSigner, InfrastructureError> {
    let keys = RsaKeyPair::from_files(&config.private_key_path, &config.public_key_path)
        .map_err(DomainError::from)?;
    Ok(TokenSigner::new(TokenSignerConfig::from(config), keys)?)
}

/// Load configuration from environment
///
/// When `SESSION_GUARD_CONFIG` names a file, it is loaded instead, with
/// `SESSION_GUARD__*` variables overriding individual fields.
pub fn load_config() -> Result<SessionGuardConfig, InfrastructureError> {
    match std::env::var("SESSION_GUARD_CONFIG") {
        Ok(path) if !path.is_empty() => SessionGuardConfig::from_file(&path)
            .map_err(|e| InfrastructureError::Config(e.to_string())),
        _ => Ok(SessionGuardConfig::from_env()),
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// A single attempt exceeded its deadline
    #[error("Cache operation timed out: {operation}")]
    Timeout { operation: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by the core services
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<InfrastructureError> for StoreError {
    fn from(error: InfrastructureError) -> Self {
        match error {
            InfrastructureError::Timeout { operation } => StoreError::Timeout { operation },
            InfrastructureError::Cache(e) if e.is_timeout() => StoreError::Timeout {
                operation: "redis".to_string(),
            },
            InfrastructureError::Domain(DomainError::Store(e)) => e,
            other => StoreError::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

//! [`KeyValueStore`] backed by Redis

use std::time::Duration;

use async_trait::async_trait;

use sg_core::{CasOutcome, KeyValueStore, StoreResult};
use sg_shared::config::CacheConfig;

use super::redis_client::RedisClient;
use crate::InfrastructureError;

/// Redis implementation of the token store seam
///
/// Every refresh record, family index and deny-list entry lives here, so
/// any number of processes pointed at the same Redis share one view of
/// the session state.
#[derive(Debug, Clone)]
pub struct RedisKeyValueStore {
    client: RedisClient,
}

impl RedisKeyValueStore {
    /// Connects using the cache configuration
    pub async fn new(config: &CacheConfig) -> Result<Self, InfrastructureError> {
        Ok(Self::from_client(RedisClient::new(config).await?))
    }

    pub fn from_client(client: RedisClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.client.get(key).await?)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        Ok(self.client.set_with_expiry(key, value, ttl).await?)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.client.delete(key).await?)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.client.exists(key).await?)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        Ok(self.client.ttl(key).await?)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new_value: &[u8],
    ) -> StoreResult<CasOutcome> {
        Ok(self.client.compare_and_swap(key, expected, new_value).await?)
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> StoreResult<()> {
        Ok(self.client.set_add(key, member, ttl).await?)
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        Ok(self.client.set_remove(key, member).await?)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(self.client.set_members(key).await?)
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self.client.scan_prefix(prefix).await?)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(self.client.health_check().await?)
    }
}

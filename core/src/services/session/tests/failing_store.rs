//! Store double that is always unreachable

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::repositories::kv::{CasOutcome, KeyValueStore, StoreResult};

pub struct UnavailableStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable {
        message: "connection refused".to_string(),
    })
}

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        down()
    }

    async fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> StoreResult<()> {
        down()
    }

    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        down()
    }

    async fn exists(&self, _key: &str) -> StoreResult<bool> {
        down()
    }

    async fn ttl(&self, _key: &str) -> StoreResult<Option<Duration>> {
        down()
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: &[u8],
        _new_value: &[u8],
    ) -> StoreResult<CasOutcome> {
        down()
    }

    async fn set_add(&self, _key: &str, _member: &str, _ttl: Duration) -> StoreResult<()> {
        down()
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> StoreResult<bool> {
        down()
    }

    async fn set_members(&self, _key: &str) -> StoreResult<Vec<String>> {
        down()
    }

    async fn scan_prefix(&self, _prefix: &str) -> StoreResult<Vec<String>> {
        down()
    }

    async fn health_check(&self) -> StoreResult<bool> {
        down()
    }
}

//! Store double whose writes fail on demand

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::repositories::kv::{CasOutcome, KeyValueStore, MemoryKeyValueStore, StoreResult};

/// In-memory store that rejects the next `n` value writes
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryKeyValueStore,
    failing_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn should_fail(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        if self.should_fail() {
            return Err(StoreError::Unavailable {
                message: "connection reset".to_string(),
            });
        }
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        self.inner.ttl(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new_value: &[u8],
    ) -> StoreResult<CasOutcome> {
        self.inner.compare_and_swap(key, expected, new_value).await
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> StoreResult<()> {
        self.inner.set_add(key, member, ttl).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        self.inner.set_members(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.scan_prefix(prefix).await
    }
}

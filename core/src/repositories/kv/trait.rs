//! Key-value store trait shared by the refresh-token store and the
//! revocation registry.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of [`KeyValueStore::compare_and_swap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored value matched and was replaced
    Swapped,
    /// The key holds a different value; nothing was written
    Mismatch,
    /// The key does not exist (never written, deleted or expired)
    Missing,
}

/// Byte-addressable store with per-key TTL and set semantics
///
/// This is the only state the token subsystem has. Every process sharing
/// one store sees the same tokens, so each operation must be atomic on its
/// own key; multi-step sequences that need atomicity go through
/// [`compare_and_swap`](KeyValueStore::compare_and_swap).
///
/// # Failure semantics
/// Implementations must fail (not hang) when the backend is unreachable
/// and report it as [`StoreError::Unavailable`] or [`StoreError::Timeout`].
/// Callers treat both as retryable and never as a negative answer.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` - Key present and not expired
    /// * `Ok(None)` - Key absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a value that disappears after `ttl`
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Delete a key of any type
    ///
    /// # Returns
    /// * `Ok(true)` - Key existed and was removed
    /// * `Ok(false)` - Key did not exist
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Whether a key is present
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Remaining lifetime of a key, `None` when absent or without expiry
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Atomically replace `expected` with `new_value`, keeping the key's TTL
    ///
    /// This is the primitive that makes refresh-token consumption single-use:
    /// of any number of concurrent callers presenting the same `expected`
    /// bytes, at most one observes [`CasOutcome::Swapped`].
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new_value: &[u8],
    ) -> StoreResult<CasOutcome>;

    /// Add a member to a set and (re)arm the set's TTL
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> StoreResult<()>;

    /// Remove a member from a set
    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// All members of a set, empty when the set does not exist
    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;

    /// All live keys starting with `prefix`
    ///
    /// O(n) in the size of the keyspace. Administrative use only.
    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Check backend connectivity
    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

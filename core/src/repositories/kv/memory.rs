//! In-memory [`KeyValueStore`] for tests, development and single-process
//! deployments.
//!
//! Expiry is lazy: an expired key is invisible to every read and is dropped
//! the next time it is touched, or in bulk by
//! [`purge_expired`](MemoryKeyValueStore::purge_expired). Time comes from
//! `tokio::time`, so tests running with a paused clock can advance past a
//! TTL without sleeping.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::r#trait::{CasOutcome, KeyValueStore, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Shared in-process key-value store
///
/// Clones share the same data. Every operation takes the write lock for
/// the whole of its read-modify-write, which is what makes
/// `compare_and_swap` atomic here.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired key, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored keys, expired-but-unpurged ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove the key if it has expired; returns the live entry otherwise
    fn live_entry<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| match &entry.value {
                Value::Bytes(bytes) => Some(bytes.clone()),
                Value::Set(_) => None,
            }))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value.to_vec()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|entry| entry.is_live(now)))
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new_value: &[u8],
    ) -> StoreResult<CasOutcome> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let Some(entry) = Self::live_entry(&mut entries, key, now) else {
            return Ok(CasOutcome::Missing);
        };

        match &mut entry.value {
            Value::Bytes(current) if current.as_slice() == expected => {
                *current = new_value.to_vec();
                Ok(CasOutcome::Swapped)
            }
            _ => Ok(CasOutcome::Mismatch),
        }
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let expires_at = Some(now + ttl);

        match Self::live_entry(&mut entries, key, now) {
            Some(Entry {
                value: Value::Set(members),
                expires_at: current,
            }) => {
                members.insert(member.to_string());
                *current = expires_at;
            }
            _ => {
                // absent, or a plain value being overwritten
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Set(HashSet::from([member.to_string()])),
                        expires_at,
                    },
                );
            }
        }
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let Some(Entry {
            value: Value::Set(members),
            ..
        }) = Self::live_entry(&mut entries, key, now)
        else {
            return Ok(false);
        };

        let removed = members.remove(member);
        if members.is_empty() {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(match entries.get(key).filter(|entry| entry.is_live(now)) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => members.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

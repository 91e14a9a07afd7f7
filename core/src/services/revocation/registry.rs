//! Revocation registry keyed by token id

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::entities::revocation::RevocationEntry;
use crate::errors::{DomainResult, ValidationError};
use crate::repositories::kv::{KeyNamespace, KeyValueStore};

/// Access-token deny-list over a shared [`KeyValueStore`]
///
/// Every entry expires when the verifier would reject the token anyway
/// (`exp` plus the verifier's leeway), so the list only ever holds revoked
/// tokens that would otherwise still be accepted.
pub struct RevocationRegistry<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    keys: KeyNamespace,
    leeway: Duration,
}

impl<S: KeyValueStore + ?Sized> Clone for RevocationRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            leeway: self.leeway,
        }
    }
}

impl<S: KeyValueStore + ?Sized> RevocationRegistry<S> {
    pub fn new(store: Arc<S>, keys: KeyNamespace) -> Self {
        Self {
            store,
            keys,
            leeway: Duration::ZERO,
        }
    }

    /// Keeps entries alive through the verifier's clock-skew leeway
    ///
    /// Must match the leeway of the signer whose tokens are revoked here.
    pub fn with_leeway(mut self, leeway_seconds: u64) -> Self {
        self.leeway = Duration::from_secs(leeway_seconds);
        self
    }

    /// Blocks `token_id` for as long as a token expiring at `expires_at`
    /// still verifies
    ///
    /// No-op when the verifier already rejects the token.
    pub async fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) -> DomainResult<()> {
        ValidationError::require("token_id", token_id)?;

        let entry = RevocationEntry::new(token_id, expires_at);
        let Some(ttl) = entry.remaining_ttl(Utc::now(), self.leeway) else {
            tracing::debug!(token_id = %token_id, "Skipping revocation of expired token");
            return Ok(());
        };

        self.store
            .set_with_ttl(
                &self.keys.revoked_token(token_id),
                entry.stored_value().as_bytes(),
                ttl,
            )
            .await?;

        tracing::info!(
            token_id = %token_id,
            ttl_secs = ttl.as_secs(),
            "Access token revoked"
        );
        Ok(())
    }

    /// Whether `token_id` is on the deny-list
    ///
    /// Call only after the token's signature has been verified. Store
    /// failures are returned as errors, never as "not revoked".
    pub async fn is_revoked(&self, token_id: &str) -> DomainResult<bool> {
        ValidationError::require("token_id", token_id)?;
        Ok(self.store.exists(&self.keys.revoked_token(token_id)).await?)
    }

    /// Removes an entry ahead of its expiry (administrative)
    pub async fn unrevoke(&self, token_id: &str) -> DomainResult<bool> {
        ValidationError::require("token_id", token_id)?;
        let removed = self.store.delete(&self.keys.revoked_token(token_id)).await?;
        if removed {
            tracing::info!(token_id = %token_id, "Access token revocation lifted");
        }
        Ok(removed)
    }

    /// Number of live entries
    ///
    /// O(n) scan over the store's keyspace; not for request paths.
    pub async fn count(&self) -> DomainResult<usize> {
        Ok(self
            .store
            .scan_prefix(&self.keys.revoked_token_prefix())
            .await?
            .len())
    }

    /// Removes every entry, returning how many were removed
    ///
    /// O(n) scan; administrative and test use only.
    pub async fn clear(&self) -> DomainResult<usize> {
        let mut removed = 0;
        for key in self
            .store
            .scan_prefix(&self.keys.revoked_token_prefix())
            .await?
        {
            if self.store.delete(&key).await? {
                removed += 1;
            }
        }
        tracing::warn!(removed, "Revocation registry cleared");
        Ok(removed)
    }
}

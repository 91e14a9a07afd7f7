//! Refresh token persistence, rotation and replay detection

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::entities::refresh_token::{RefreshTokenRecord, RotatedRefreshToken};
use crate::domain::entities::session::RequestOrigin;
use crate::errors::{
    ConfigError, DomainError, DomainResult, StoreError, TokenError, ValidationError,
};
use crate::repositories::kv::{CasOutcome, KeyNamespace, KeyValueStore};
use crate::services::token::max_token_ttl;

/// Entropy of a refresh secret, in bytes
pub const SECRET_BYTES: usize = 32;

/// Hex SHA-256 of a refresh secret, the only form ever persisted
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Refresh token store over a shared [`KeyValueStore`]
///
/// Holds no state of its own; any number of processes pointed at the same
/// store see the same families.
pub struct RefreshTokenStore<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    keys: KeyNamespace,
    ttl: Duration,
    store_ttl: std::time::Duration,
}

impl<S: KeyValueStore + ?Sized> Clone for RefreshTokenStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            ttl: self.ttl,
            store_ttl: self.store_ttl,
        }
    }
}

impl<S: KeyValueStore + ?Sized> RefreshTokenStore<S> {
    /// Creates a store issuing secrets that live for `ttl`
    pub fn new(store: Arc<S>, keys: KeyNamespace, ttl: Duration) -> DomainResult<Self> {
        let store_ttl = Some(ttl)
            .filter(|ttl| *ttl <= max_token_ttl())
            .and_then(|ttl| ttl.to_std().ok())
            .filter(|ttl| !ttl.is_zero())
            .ok_or_else(|| ConfigError::InvalidTtl {
                name: "refresh_token_ttl".to_string(),
            })?;

        Ok(Self {
            store,
            keys,
            ttl,
            store_ttl,
        })
    }

    /// Refresh secret lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a new refresh secret
    ///
    /// The plaintext is returned exactly once, here. Pass `parent_hash` when
    /// the secret succeeds another one in the same family.
    ///
    /// # Returns
    ///
    /// * `Ok((secret, record))` - Persisted unused record and its secret
    /// * `Err(DomainError::Validation)` - Empty subject, session or family id
    /// * `Err(TokenError::InvalidRefreshToken)` - The family has been revoked
    pub async fn issue(
        &self,
        subject_id: &str,
        session_id: &str,
        family_id: &str,
        parent_hash: Option<&str>,
        origin: &RequestOrigin,
    ) -> DomainResult<(String, RefreshTokenRecord)> {
        ValidationError::require("subject_id", subject_id)?;
        ValidationError::require("session_id", session_id)?;
        ValidationError::require("family_id", family_id)?;

        let tombstone = self.keys.revoked_family(family_id);
        if self.store.exists(&tombstone).await? {
            return Err(TokenError::InvalidRefreshToken.into());
        }

        let family_key = self.keys.refresh_family(family_id);
        let subject_key = self.keys.refresh_subject(subject_id);
        if parent_hash.is_some() {
            self.prune_family(&family_key).await;
        } else {
            self.prune_subject(&subject_key).await;
        }

        let secret = generate_secret();
        let now = Utc::now();
        let record = RefreshTokenRecord {
            token_hash: hash_secret(&secret),
            subject_id: subject_id.to_string(),
            session_id: session_id.to_string(),
            family_id: family_id.to_string(),
            parent_hash: parent_hash.map(str::to_string),
            issued_at: now,
            expires_at: now + self.ttl,
            origin_ip: origin.ip.clone(),
            origin_user_agent: origin.user_agent.clone(),
            used: false,
        };

        let record_key = self.keys.refresh_token(&record.token_hash);
        self.store
            .set_with_ttl(&record_key, &encode_record(&record)?, self.store_ttl)
            .await?;
        self.store
            .set_add(&family_key, &record.token_hash, self.store_ttl)
            .await?;
        self.store
            .set_add(&subject_key, family_id, self.store_ttl)
            .await?;

        // revoke_family writes the tombstone before listing members, so a
        // revocation racing this issue is caught by one side or the other
        if self.store.exists(&tombstone).await? {
            self.store.delete(&record_key).await?;
            self.store.set_remove(&family_key, &record.token_hash).await?;
            self.store.set_remove(&subject_key, family_id).await?;
            return Err(TokenError::InvalidRefreshToken.into());
        }

        tracing::debug!(
            session_id = %record.session_id,
            family_id = %record.family_id,
            chain_head = record.is_chain_head(),
            "Refresh token issued"
        );

        Ok((secret, record))
    }

    /// Checks a secret without consuming it
    ///
    /// A secret that was already exchanged is a replay: its whole family is
    /// revoked before the error is returned.
    pub async fn validate(&self, secret: &str) -> DomainResult<RefreshTokenRecord> {
        let (_, record) = self.fetch_live(secret).await?;
        Ok(record)
    }

    /// Marks a secret used; alias of [`validate_and_consume`](Self::validate_and_consume)
    pub async fn consume(&self, secret: &str) -> DomainResult<RefreshTokenRecord> {
        self.validate_and_consume(secret).await
    }

    /// Validates a secret and flips it to used in one atomic step
    ///
    /// The flip is a compare-and-swap against the exact bytes that were
    /// read, so of any number of concurrent callers presenting the same
    /// secret at most one succeeds. Every loser gets
    /// [`TokenError::ReplayDetected`] and the family is revoked.
    ///
    /// # Returns
    ///
    /// * `Ok(record)` - The consumed record (`used == true`)
    /// * `Err(TokenError::InvalidRefreshToken)` - Unknown, expired or revoked
    /// * `Err(TokenError::ReplayDetected)` - Secret already used
    pub async fn validate_and_consume(&self, secret: &str) -> DomainResult<RefreshTokenRecord> {
        Ok(self.consume_entry(secret).await?.record)
    }

    async fn consume_entry(&self, secret: &str) -> DomainResult<ConsumedEntry> {
        let (stored, record) = self.fetch_live(secret).await?;
        let consumed = record.consumed();
        let consumed_bytes = encode_record(&consumed)?;
        let key = self.keys.refresh_token(&record.token_hash);

        match self
            .store
            .compare_and_swap(&key, &stored, &consumed_bytes)
            .await?
        {
            CasOutcome::Swapped => {
                tracing::debug!(
                    session_id = %consumed.session_id,
                    family_id = %consumed.family_id,
                    "Refresh token consumed"
                );
                Ok(ConsumedEntry {
                    key,
                    original: stored,
                    consumed: consumed_bytes,
                    record: consumed,
                })
            }
            CasOutcome::Mismatch => {
                // lost the race; whoever won marked it used
                match self.fetch(&record.token_hash).await? {
                    Some((_, current)) if current.used => Err(self.replay(&current).await),
                    _ => Err(TokenError::InvalidRefreshToken.into()),
                }
            }
            CasOutcome::Missing => Err(TokenError::InvalidRefreshToken.into()),
        }
    }

    /// Puts a consumed record back to its unused bytes after its successor
    /// could not be issued, so the caller's retry is not taken for a replay
    async fn restore(&self, entry: &ConsumedEntry) {
        match self
            .store
            .compare_and_swap(&entry.key, &entry.consumed, &entry.original)
            .await
        {
            Ok(CasOutcome::Swapped) => tracing::warn!(
                session_id = %entry.record.session_id,
                family_id = %entry.record.family_id,
                "Refresh token rotation rolled back"
            ),
            Ok(outcome) => tracing::debug!(
                family_id = %entry.record.family_id,
                ?outcome,
                "Refresh token changed before rollback"
            ),
            Err(e) => tracing::error!(
                error = %e,
                family_id = %entry.record.family_id,
                "Failed to roll back refresh token rotation"
            ),
        }
    }

    /// Exchanges a secret for its successor in the same family
    ///
    /// When the successor cannot be issued the presented secret is put back
    /// to unused before the error is returned, so a retry after a store
    /// outage succeeds instead of looking like a replay.
    pub async fn rotate(
        &self,
        secret: &str,
        origin: &RequestOrigin,
    ) -> DomainResult<RotatedRefreshToken> {
        let entry = self.consume_entry(secret).await?;
        let previous = entry.record.clone();
        let anomaly = self.detect_anomaly(&previous, &origin.ip, &origin.user_agent);
        if anomaly {
            tracing::warn!(
                session_id = %previous.session_id,
                family_id = %previous.family_id,
                issued_ip = %previous.origin_ip,
                current_ip = %origin.ip,
                "Refresh request origin differs from issuance origin"
            );
        }

        let issued = self
            .issue(
                &previous.subject_id,
                &previous.session_id,
                &previous.family_id,
                Some(&previous.token_hash),
                origin,
            )
            .await;
        let (secret, record) = match issued {
            Ok(issued) => issued,
            Err(e) => {
                self.restore(&entry).await;
                return Err(e);
            }
        };

        Ok(RotatedRefreshToken {
            secret,
            record,
            previous,
            anomaly,
        })
    }

    /// Reads the record behind a secret with no side effects
    ///
    /// Returns used records too; `None` when unknown or expired.
    pub async fn lookup(&self, secret: &str) -> DomainResult<Option<RefreshTokenRecord>> {
        if secret.is_empty() {
            return Ok(None);
        }
        Ok(self
            .fetch(&hash_secret(secret))
            .await?
            .map(|(_, record)| record)
            .filter(|record| !record.is_expired()))
    }

    /// Deletes one secret and detaches it from its family
    pub async fn revoke(&self, secret: &str) -> DomainResult<bool> {
        let token_hash = hash_secret(secret);
        let record = self.fetch(&token_hash).await?;
        let deleted = self
            .store
            .delete(&self.keys.refresh_token(&token_hash))
            .await?;

        if let Some((_, record)) = record {
            self.store
                .set_remove(&self.keys.refresh_family(&record.family_id), &token_hash)
                .await?;
            tracing::info!(
                session_id = %record.session_id,
                family_id = %record.family_id,
                "Refresh token revoked"
            );
        }
        Ok(deleted)
    }

    /// Deletes every record in a family and blocks further issuance into it
    ///
    /// # Returns
    ///
    /// Number of records deleted
    pub async fn revoke_family(&self, family_id: &str) -> DomainResult<usize> {
        ValidationError::require("family_id", family_id)?;

        self.store
            .set_with_ttl(
                &self.keys.revoked_family(family_id),
                Utc::now().to_rfc3339().as_bytes(),
                self.store_ttl,
            )
            .await?;

        let family_key = self.keys.refresh_family(family_id);
        let mut deleted = 0;
        let mut subjects = BTreeSet::new();
        for token_hash in self.store.set_members(&family_key).await? {
            let record_key = self.keys.refresh_token(&token_hash);
            if let Some(bytes) = self.store.get(&record_key).await? {
                if let Ok(record) = serde_json::from_slice::<RefreshTokenRecord>(&bytes) {
                    subjects.insert(record.subject_id);
                }
            }
            if self.store.delete(&record_key).await? {
                deleted += 1;
            }
        }
        self.store.delete(&family_key).await?;
        for subject_id in subjects {
            self.store
                .set_remove(&self.keys.refresh_subject(&subject_id), family_id)
                .await?;
        }

        tracing::info!(family_id = %family_id, deleted, "Refresh token family revoked");
        Ok(deleted)
    }

    /// Revokes every family a subject holds ("log out everywhere")
    ///
    /// # Returns
    ///
    /// Number of records deleted across all families
    pub async fn revoke_all_for_subject(&self, subject_id: &str) -> DomainResult<usize> {
        ValidationError::require("subject_id", subject_id)?;

        let subject_key = self.keys.refresh_subject(subject_id);
        let mut deleted = 0;
        for family_id in self.store.set_members(&subject_key).await? {
            deleted += self.revoke_family(&family_id).await?;
        }
        self.store.delete(&subject_key).await?;

        tracing::info!(subject_id = %subject_id, deleted, "All refresh tokens revoked for subject");
        Ok(deleted)
    }

    /// Soft signal: the request comes from somewhere other than where the
    /// record was issued
    ///
    /// Only recorded, non-empty origins are compared. Address and agent
    /// drift have legitimate causes, so this never rejects anything.
    pub fn detect_anomaly(
        &self,
        record: &RefreshTokenRecord,
        current_ip: &str,
        current_user_agent: &str,
    ) -> bool {
        let drifted = |recorded: &str, current: &str| !recorded.is_empty() && recorded != current;
        drifted(&record.origin_ip, current_ip)
            || drifted(&record.origin_user_agent, current_user_agent)
    }

    /// Drops hashes whose record has expired or been deleted
    ///
    /// Housekeeping only: failures are logged and issuance goes on.
    async fn prune_family(&self, family_key: &str) {
        log_pruned(family_key, self.try_prune_family(family_key).await);
    }

    async fn try_prune_family(&self, family_key: &str) -> DomainResult<usize> {
        let mut pruned = 0;
        for token_hash in self.store.set_members(family_key).await? {
            let alive = self
                .store
                .exists(&self.keys.refresh_token(&token_hash))
                .await?;
            if !alive && self.store.set_remove(family_key, &token_hash).await? {
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    /// Drops family ids whose member set has expired or been revoked
    async fn prune_subject(&self, subject_key: &str) {
        log_pruned(subject_key, self.try_prune_subject(subject_key).await);
    }

    async fn try_prune_subject(&self, subject_key: &str) -> DomainResult<usize> {
        let mut pruned = 0;
        for family_id in self.store.set_members(subject_key).await? {
            let alive = self
                .store
                .exists(&self.keys.refresh_family(&family_id))
                .await?;
            if !alive && self.store.set_remove(subject_key, &family_id).await? {
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    async fn fetch(&self, token_hash: &str) -> DomainResult<Option<(Vec<u8>, RefreshTokenRecord)>> {
        let key = self.keys.refresh_token(token_hash);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupted {
            key: key.clone(),
            message: e.to_string(),
        })?;
        Ok(Some((bytes, record)))
    }

    /// Stored bytes and record for a secret that may still be exchanged
    async fn fetch_live(&self, secret: &str) -> DomainResult<(Vec<u8>, RefreshTokenRecord)> {
        if secret.is_empty() {
            return Err(TokenError::InvalidRefreshToken.into());
        }

        let (bytes, record) = self
            .fetch(&hash_secret(secret))
            .await?
            .ok_or(DomainError::Token(TokenError::InvalidRefreshToken))?;

        if record.used {
            return Err(self.replay(&record).await);
        }
        if record.is_expired() {
            return Err(TokenError::InvalidRefreshToken.into());
        }
        Ok((bytes, record))
    }

    /// Kill the family of a replayed record and build the error to return
    async fn replay(&self, record: &RefreshTokenRecord) -> DomainError {
        tracing::error!(
            subject_id = %record.subject_id,
            session_id = %record.session_id,
            family_id = %record.family_id,
            "Refresh token replay detected, revoking family"
        );

        match self.revoke_family(&record.family_id).await {
            Ok(_) => TokenError::ReplayDetected {
                family_id: record.family_id.clone(),
            }
            .into(),
            Err(e) => e,
        }
    }
}

/// Bytes read and written by a successful consume
struct ConsumedEntry {
    key: String,
    original: Vec<u8>,
    consumed: Vec<u8>,
    record: RefreshTokenRecord,
}

fn log_pruned(index_key: &str, result: DomainResult<usize>) {
    match result {
        Ok(0) => {}
        Ok(pruned) => tracing::debug!(index = %index_key, pruned, "Pruned stale index entries"),
        Err(e) => tracing::warn!(index = %index_key, error = %e, "Index pruning failed"),
    }
}

fn encode_record(record: &RefreshTokenRecord) -> DomainResult<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| DomainError::Internal {
        message: format!("Failed to encode refresh token record: {}", e),
    })
}

//! Revocation entry for access tokens that must stop working before expiry.

use chrono::{DateTime, Duration, Utc};

/// A blocked access-token id
///
/// The stored value is the token's own expiry and is diagnostic only; the
/// entry's store TTL is what bounds its life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationEntry {
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl RevocationEntry {
    pub fn new(token_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_id: token_id.into(),
            expires_at,
        }
    }

    /// Instant from which the verifier rejects the token on its own
    ///
    /// Verification compares whole seconds and still accepts a token whose
    /// `exp` equals the current second, plus `leeway`.
    pub fn rejected_from(&self, leeway: std::time::Duration) -> DateTime<Utc> {
        leeway
            .checked_add(std::time::Duration::from_secs(1))
            .and_then(|window| Duration::from_std(window).ok())
            .and_then(|window| self.expires_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Lifetime the entry needs at `now` to outlast the verifier's
    /// acceptance window, rounded up to whole seconds, or `None` when the
    /// verifier already rejects the token and no entry is needed.
    pub fn remaining_ttl(
        &self,
        now: DateTime<Utc>,
        leeway: std::time::Duration,
    ) -> Option<std::time::Duration> {
        let remaining = (self.rejected_from(leeway) - now).to_std().ok()?;
        if remaining.is_zero() {
            return None;
        }
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Some(std::time::Duration::from_secs(secs))
    }

    /// Value written to the store
    pub fn stored_value(&self) -> String {
        self.expires_at.to_rfc3339()
    }
}

//! Key layout inside the shared store.
//!
//! - `{prefix}:refresh_token:{hash}` - refresh token record (JSON)
//! - `{prefix}:refresh_family:{family_id}` - set of record hashes in a family
//! - `{prefix}:refresh_family_revoked:{family_id}` - tombstone for a killed family
//! - `{prefix}:refresh_subject:{subject_id}` - set of family ids per principal
//! - `{prefix}:revoked_token:{jti}` - revoked access token marker

/// Default namespace prefix
pub const DEFAULT_PREFIX: &str = "sg";

/// Builds every key SessionGuard writes, under one configurable prefix so
/// other tenants of the same store never collide with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl Default for KeyNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches(':').to_string();
        Self {
            prefix: if prefix.is_empty() {
                DEFAULT_PREFIX.to_string()
            } else {
                prefix
            },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn refresh_token(&self, token_hash: &str) -> String {
        format!("{}:refresh_token:{}", self.prefix, token_hash)
    }

    pub fn refresh_family(&self, family_id: &str) -> String {
        format!("{}:refresh_family:{}", self.prefix, family_id)
    }

    pub fn revoked_family(&self, family_id: &str) -> String {
        format!("{}:refresh_family_revoked:{}", self.prefix, family_id)
    }

    pub fn refresh_subject(&self, subject_id: &str) -> String {
        format!("{}:refresh_subject:{}", self.prefix, subject_id)
    }

    pub fn revoked_token(&self, token_id: &str) -> String {
        format!("{}{}", self.revoked_token_prefix(), token_id)
    }

    /// Prefix shared by every revocation entry
    pub fn revoked_token_prefix(&self) -> String {
        format!("{}:revoked_token:", self.prefix)
    }
}

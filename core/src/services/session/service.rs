//! Session service: login, per-request authentication, refresh and logout

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entities::session::{Principal, RefreshOutcome, RequestOrigin, SessionTokens};
use crate::domain::entities::token::Claims;
use crate::errors::{DomainError, DomainResult, TokenError, ValidationError};
use crate::repositories::kv::{KeyNamespace, KeyValueStore};
use crate::services::refresh::RefreshTokenStore;
use crate::services::revocation::RevocationRegistry;
use crate::services::token::TokenSigner;

/// Composes the three token components into the session lifecycle
///
/// Construct once per process and share; every piece of state lives in
/// the key-value store.
pub struct SessionService<S: KeyValueStore + ?Sized> {
    signer: TokenSigner,
    refresh_tokens: RefreshTokenStore<S>,
    revocations: RevocationRegistry<S>,
}

impl<S: KeyValueStore + ?Sized> Clone for SessionService<S> {
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
            refresh_tokens: self.refresh_tokens.clone(),
            revocations: self.revocations.clone(),
        }
    }
}

impl<S: KeyValueStore + ?Sized> SessionService<S> {
    /// Creates a service whose refresh secrets share the signer's refresh
    /// lifetime
    pub fn new(signer: TokenSigner, store: Arc<S>, keys: KeyNamespace) -> DomainResult<Self> {
        let refresh_tokens = RefreshTokenStore::new(
            Arc::clone(&store),
            keys.clone(),
            signer.config().refresh_token_ttl,
        )?;
        let revocations =
            RevocationRegistry::new(store, keys).with_leeway(signer.config().leeway_seconds);

        Ok(Self::from_parts(signer, refresh_tokens, revocations))
    }

    pub fn from_parts(
        signer: TokenSigner,
        refresh_tokens: RefreshTokenStore<S>,
        revocations: RevocationRegistry<S>,
    ) -> Self {
        Self {
            signer,
            refresh_tokens,
            revocations,
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore<S> {
        &self.refresh_tokens
    }

    pub fn revocations(&self) -> &RevocationRegistry<S> {
        &self.revocations
    }

    /// Starts a session for an already-authenticated principal
    ///
    /// Opens a new session id and a new refresh family.
    pub async fn login(
        &self,
        principal: &Principal,
        origin: &RequestOrigin,
    ) -> DomainResult<SessionTokens> {
        let session_id = Uuid::new_v4().to_string();
        let family_id = Uuid::new_v4().to_string();

        let access = self.signer.issue_access_token(
            &principal.subject_id,
            &principal.email,
            &principal.role,
            &session_id,
        )?;
        let (refresh_secret, record) = self
            .refresh_tokens
            .issue(&principal.subject_id, &session_id, &family_id, None, origin)
            .await?;

        tracing::info!(
            subject_id = %principal.subject_id,
            session_id = %session_id,
            family_id = %family_id,
            "Session started"
        );

        Ok(SessionTokens {
            access_expires_at: access.expires_at(),
            access_token: access.token,
            refresh_token: refresh_secret,
            session_id,
            family_id,
            refresh_expires_at: record.expires_at,
        })
    }

    /// Authenticates one request's access token
    ///
    /// The signature is verified first; the deny-list is only consulted for
    /// tokens that passed verification.
    pub async fn authenticate(&self, access_token: &str) -> DomainResult<Claims> {
        let claims = self.signer.verify_access(access_token)?;

        if self.revocations.is_revoked(&claims.jti).await? {
            tracing::warn!(
                token_id = %claims.jti,
                session_id = %claims.sid,
                "Revoked access token presented"
            );
            return Err(TokenError::TokenRevoked.into());
        }

        Ok(claims)
    }

    /// Exchanges a refresh secret for a new access token and secret
    ///
    /// `principal` is the caller's current view of the subject (role and
    /// email may have changed since login); it must be the subject the
    /// secret was issued to. Use
    /// [`RefreshTokenStore::lookup`] to find that subject first.
    pub async fn refresh(
        &self,
        refresh_secret: &str,
        principal: &Principal,
        origin: &RequestOrigin,
    ) -> DomainResult<RefreshOutcome> {
        // checked before the secret is consumed: a rejected principal must
        // leave the secret usable
        ValidationError::require("subject_id", &principal.subject_id)?;
        ValidationError::require("email", &principal.email)?;
        ValidationError::require("role", &principal.role)?;

        let rotated = self.refresh_tokens.rotate(refresh_secret, origin).await?;
        let record = rotated.record;

        if record.subject_id != principal.subject_id {
            tracing::error!(
                session_id = %record.session_id,
                family_id = %record.family_id,
                "Refresh secret presented for a different subject"
            );
            self.refresh_tokens.revoke_family(&record.family_id).await?;
            return Err(TokenError::InvalidRefreshToken.into());
        }

        let access = self.signer.issue_access_token(
            &principal.subject_id,
            &principal.email,
            &principal.role,
            &record.session_id,
        )?;

        tracing::info!(
            session_id = %record.session_id,
            family_id = %record.family_id,
            anomaly = rotated.anomaly,
            "Session refreshed"
        );

        Ok(RefreshOutcome {
            tokens: SessionTokens {
                access_expires_at: access.expires_at(),
                access_token: access.token,
                refresh_token: rotated.secret,
                session_id: record.session_id,
                family_id: record.family_id,
                refresh_expires_at: record.expires_at,
            },
            anomaly: rotated.anomaly,
        })
    }

    /// Ends a session
    ///
    /// A still-valid access token is put on the deny-list; an expired one
    /// needs no entry. The refresh secret's whole family is revoked. Any
    /// other access-token failure aborts the logout.
    pub async fn logout(&self, access_token: &str, refresh_secret: &str) -> DomainResult<()> {
        let claims = match self.signer.verify_access(access_token) {
            Ok(claims) => {
                self.revocations
                    .revoke(&claims.jti, claims.expires_at())
                    .await?;
                Some(claims)
            }
            Err(DomainError::Token(TokenError::TokenExpired)) => None,
            Err(e) => return Err(e),
        };

        let Some(record) = self.refresh_tokens.lookup(refresh_secret).await? else {
            tracing::debug!("Logout with unknown or expired refresh secret");
            return Ok(());
        };

        if let Some(claims) = &claims {
            if claims.sub != record.subject_id {
                tracing::warn!(
                    token_id = %claims.jti,
                    family_id = %record.family_id,
                    "Logout refresh secret belongs to another subject"
                );
                return Err(TokenError::InvalidRefreshToken.into());
            }
        }

        self.refresh_tokens.revoke_family(&record.family_id).await?;

        tracing::info!(
            session_id = %record.session_id,
            family_id = %record.family_id,
            "Session ended"
        );
        Ok(())
    }

    /// Revokes every refresh family of a subject
    ///
    /// Access tokens already handed out stay valid until they expire unless
    /// revoked individually.
    pub async fn logout_everywhere(&self, subject_id: &str) -> DomainResult<usize> {
        self.refresh_tokens.revoke_all_for_subject(subject_id).await
    }
}

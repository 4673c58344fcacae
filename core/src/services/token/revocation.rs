//! Access token revocation registry
//!
//! Holds fingerprints of access tokens that must be rejected before their
//! natural expiry (logout, security incidents). Entries live exactly as long
//! as the token they shadow: expired entries are dropped lazily on lookup and
//! in bulk by the periodic sweep.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use bc_shared::RevocationFailMode;

use crate::domain::entities::{RevocationEntry, RevocationReason};
use crate::errors::{DomainError, TokenError};
use crate::repositories::RevocationRepository;
use crate::services::clock::Clock;

use super::codec::{short_fingerprint, TokenCodec};
use super::config::TokenServiceConfig;

/// Registry of revoked access tokens
pub struct AccessTokenRevocationRegistry<R: RevocationRepository> {
    repository: Arc<R>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    default_horizon: chrono::Duration,
    fail_mode: RevocationFailMode,
}

impl<R: RevocationRepository> AccessTokenRevocationRegistry<R> {
    /// Creates a registry over `repository`
    ///
    /// # Arguments
    ///
    /// * `repository` - Shared revocation store
    /// * `codec` - Used to read the expiry of revoked tokens
    /// * `clock` - Time source for expiry decisions
    /// * `config` - Supplies the default horizon and the fail mode
    pub fn new(
        repository: Arc<R>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        config: &TokenServiceConfig,
    ) -> Self {
        Self {
            repository,
            codec,
            clock,
            default_horizon: config.revocation_default_horizon(),
            fail_mode: config.revocation_fail_mode,
        }
    }

    /// Revokes an access token
    ///
    /// The entry expires with the token. A token without `exp` is held for
    /// the default horizon. The revocation is visible to the next
    /// [`is_revoked`](Self::is_revoked) call on any instance sharing the store.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Token recorded as revoked
    /// * `Err(TokenError::RevocationFailed)` - Token is not a decodable JWT
    /// * `Err(TokenError::StorageFailure)` - Store unreachable
    pub async fn revoke(
        &self,
        raw_token: &str,
        subject_id: &str,
        reason: RevocationReason,
    ) -> Result<(), DomainError> {
        let fingerprint = TokenCodec::fingerprint(raw_token);
        let now = self.clock.now();

        let exp = self.codec.peek_expiry(raw_token).map_err(|_| {
            warn!(
                subject_id = %subject_id,
                fingerprint = %short_fingerprint(&fingerprint),
                "Cannot revoke malformed access token"
            );
            DomainError::Token(TokenError::RevocationFailed)
        })?;

        let expires_at = exp
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or(now + self.default_horizon);

        let entry = RevocationEntry::new(fingerprint, subject_id, expires_at, reason, now);
        let logged = short_fingerprint(&entry.token_fingerprint).to_string();

        self.repository.upsert(entry).await.map_err(|e| {
            error!(fingerprint = %logged, "Failed to store revocation entry: {}", e);
            into_storage_failure(e)
        })?;

        info!(
            subject_id = %subject_id,
            fingerprint = %logged,
            reason = %reason,
            expires_at = %expires_at,
            "Access token revoked"
        );
        Ok(())
    }

    /// Checks whether an access token has been revoked
    ///
    /// Expired entries are deleted on sight and reported as not revoked. When
    /// the store fails, the answer follows the configured fail mode: `Open`
    /// reports not revoked, `Closed` reports revoked.
    pub async fn is_revoked(&self, raw_token: &str) -> bool {
        let fingerprint = TokenCodec::fingerprint(raw_token);

        match self.repository.find(&fingerprint).await {
            Ok(Some(entry)) => {
                if entry.is_expired_at(self.clock.now()) {
                    self.remove_expired(&fingerprint).await;
                    false
                } else {
                    true
                }
            }
            Ok(None) => false,
            Err(e) => match self.fail_mode {
                RevocationFailMode::Open => {
                    warn!(
                        fingerprint = %short_fingerprint(&fingerprint),
                        "Revocation lookup failed, treating token as not revoked: {}", e
                    );
                    false
                }
                RevocationFailMode::Closed => {
                    error!(
                        fingerprint = %short_fingerprint(&fingerprint),
                        "Revocation lookup failed, treating token as revoked: {}", e
                    );
                    true
                }
            },
        }
    }

    /// Returns the live entry for a token without applying the fail mode
    pub async fn lookup(&self, raw_token: &str) -> Result<Option<RevocationEntry>, DomainError> {
        let fingerprint = TokenCodec::fingerprint(raw_token);

        match self.repository.find(&fingerprint).await.map_err(into_storage_failure)? {
            Some(entry) if entry.is_expired_at(self.clock.now()) => {
                self.remove_expired(&fingerprint).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Re-labels every entry held for `subject_id` as a security incident
    ///
    /// Tokens of the subject that were never revoked are not affected; they
    /// expire on their own.
    pub async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<usize, DomainError> {
        let count = self
            .repository
            .mark_subject(subject_id, RevocationReason::SecurityIncident)
            .await
            .map_err(into_storage_failure)?;

        info!(subject_id = %subject_id, entries = count, "Revocation entries flagged as security incident");
        Ok(count)
    }

    /// Deletes entries whose token has expired
    pub async fn sweep_expired(&self) -> Result<usize, DomainError> {
        let removed = self
            .repository
            .delete_expired(self.clock.now())
            .await
            .map_err(into_storage_failure)?;

        debug!(removed, "Revocation registry swept");
        Ok(removed)
    }

    async fn remove_expired(&self, fingerprint: &str) {
        if let Err(e) = self.repository.remove(fingerprint).await {
            debug!(
                fingerprint = %short_fingerprint(fingerprint),
                "Lazy removal of expired revocation entry failed: {}", e
            );
        }
    }
}

/// Maps non-token store errors to `StorageFailure`
pub(crate) fn into_storage_failure(err: DomainError) -> DomainError {
    match err {
        DomainError::Token(_) => err,
        other => DomainError::storage(other.to_string()),
    }
}

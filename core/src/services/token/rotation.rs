//! Refresh token rotation with family based replay detection
//!
//! Every login starts a token family. Each refresh consumes the presented
//! token and mints a successor in the same family. Presenting a consumed
//! token again is treated as theft: the whole family is revoked and every
//! holder has to log in again.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::{
    IssuedRefreshToken, RefreshClaims, RefreshTokenRecord, RotatedRefreshToken, SubjectClaims,
    TokenKind,
};
use crate::errors::{DomainError, TokenError};
use crate::repositories::RefreshTokenRepository;
use crate::services::clock::Clock;

use super::codec::TokenCodec;
use super::config::TokenServiceConfig;
use super::revocation::into_storage_failure;

/// Issues and rotates refresh tokens
pub struct RefreshTokenRotationManager<R: RefreshTokenRepository> {
    repository: Arc<R>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    validity: Duration,
    issuer: String,
    audience: String,
}

impl<R: RefreshTokenRepository> RefreshTokenRotationManager<R> {
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
            validity: config.refresh_token_ttl(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// Issues a refresh token
    ///
    /// # Arguments
    ///
    /// * `subject` - Identity embedded in the token
    /// * `existing_family_id` - Family to continue, or `None` to start a new one
    ///
    /// # Returns
    ///
    /// The signed token. Its record is stored before this returns. A revoked
    /// family cannot be continued.
    pub async fn issue(
        &self,
        subject: &SubjectClaims,
        existing_family_id: Option<Uuid>,
    ) -> Result<IssuedRefreshToken, DomainError> {
        let family_id = existing_family_id.unwrap_or_else(Uuid::new_v4);
        let (issued, record) = self.mint(subject, family_id)?;

        self.repository.insert(record).await.map_err(|e| {
            error!(token_id = %issued.token_id, family_id = %family_id, "Failed to store refresh token: {}", e);
            match e {
                DomainError::Validation { .. } => e,
                other => into_storage_failure(other),
            }
        })?;

        debug!(
            subject_id = %subject.subject_id,
            token_id = %issued.token_id,
            family_id = %family_id,
            "Refresh token issued"
        );

        Ok(issued)
    }

    /// Exchanges a refresh token for its successor
    ///
    /// # Returns
    ///
    /// * `Ok(RotatedRefreshToken)` - Successor in the same family
    /// * `Err(TokenError::InvalidToken)` - Bad signature, malformed, or not a refresh token
    /// * `Err(TokenError::TokenExpired)` - Past its validity window; the record is purged
    /// * `Err(TokenError::TokenNotFound)` - No record for the embedded token id
    /// * `Err(TokenError::TokenReplayDetected)` - Already used or family revoked; the family is revoked
    /// * `Err(TokenError::StorageFailure)` - Store failed; the presented token is untouched
    ///
    /// A successor whose family is revoked concurrently is returned already
    /// revoked, so presenting it fails.
    pub async fn rotate(&self, presented: &str) -> Result<RotatedRefreshToken, DomainError> {
        let claims = self.decode(presented)?;
        let now = self.clock.now();

        if claims.is_expired_at(now) {
            self.purge(claims.token_id).await;
            return Err(TokenError::TokenExpired.into());
        }

        let record = self
            .repository
            .find_by_token_id(claims.token_id)
            .await
            .map_err(into_storage_failure)?
            .ok_or(TokenError::TokenNotFound)?;

        if record.is_revoked {
            return Err(self.replay_detected(&record).await);
        }

        if record.is_expired_at(now) {
            self.purge(record.token_id).await;
            return Err(TokenError::TokenExpired.into());
        }

        let subject = claims.subject();
        let (issued, successor) = self.mint(&subject, record.family_id)?;

        // Consuming the presented token and storing the successor is one write
        match self.repository.exchange(record.token_id, successor, now).await {
            Ok(true) => {}
            Ok(false) => return Err(self.replay_detected(&record).await),
            Err(e) => {
                error!(token_id = %record.token_id, "Failed to exchange refresh token: {}", e);
                return Err(into_storage_failure(e));
            }
        }

        // A replay may have revoked the family while the exchange was in
        // flight. The rotation itself won, but the successor must not outlive
        // its family.
        match self.repository.is_family_revoked(record.family_id).await {
            Ok(false) => {}
            Ok(true) => {
                warn!(
                    family_id = %record.family_id,
                    token_id = %issued.token_id,
                    "Family revoked during rotation, withdrawing successor"
                );
                if let Err(e) = self.repository.revoke(issued.token_id).await {
                    error!(token_id = %issued.token_id, "Failed to withdraw successor: {}", e);
                }
            }
            Err(e) => {
                warn!(family_id = %record.family_id, "Could not re-check family after rotation: {}", e);
            }
        }

        info!(
            subject_id = %subject.subject_id,
            family_id = %issued.family_id,
            previous_token_id = %record.token_id,
            token_id = %issued.token_id,
            "Refresh token rotated"
        );

        Ok(RotatedRefreshToken {
            token: issued.token,
            claims: subject,
            token_id: issued.token_id,
            family_id: issued.family_id,
            expires_at: issued.expires_at,
        })
    }

    /// Verifies a refresh token without touching the store
    pub fn decode(&self, presented: &str) -> Result<RefreshClaims, DomainError> {
        let claims: RefreshClaims = self.codec.decode(presented)?;
        if claims.kind != TokenKind::Refresh {
            return Err(TokenError::InvalidToken.into());
        }
        Ok(claims)
    }

    /// Revokes a single token. Returns `false` if absent or already revoked.
    pub async fn revoke(&self, token_id: Uuid) -> Result<bool, DomainError> {
        self.repository.revoke(token_id).await.map_err(into_storage_failure)
    }

    /// Revokes every active token of a family
    pub async fn revoke_family(&self, family_id: Uuid) -> Result<usize, DomainError> {
        let count = self
            .repository
            .revoke_family(family_id)
            .await
            .map_err(into_storage_failure)?;

        info!(family_id = %family_id, revoked = count, "Refresh token family revoked");
        Ok(count)
    }

    /// Revokes every active token of a subject across all families
    pub async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<usize, DomainError> {
        let count = self
            .repository
            .revoke_all_for_subject(subject_id)
            .await
            .map_err(into_storage_failure)?;

        info!(subject_id = %subject_id, revoked = count, "Refresh tokens revoked for subject");
        Ok(count)
    }

    /// All records of a family, oldest first
    pub async fn family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        self.repository
            .find_by_family(family_id)
            .await
            .map_err(into_storage_failure)
    }

    /// Deletes expired records
    pub async fn sweep_expired(&self) -> Result<usize, DomainError> {
        let removed = self
            .repository
            .delete_expired(self.clock.now())
            .await
            .map_err(into_storage_failure)?;

        debug!(removed, "Refresh token store swept");
        Ok(removed)
    }

    async fn replay_detected(&self, record: &RefreshTokenRecord) -> DomainError {
        warn!(
            subject_id = %record.subject_id,
            family_id = %record.family_id,
            token_id = %record.token_id,
            "Refresh token reuse detected, revoking family"
        );

        if let Err(e) = self.revoke_family(record.family_id).await {
            error!(family_id = %record.family_id, "Failed to revoke family after replay: {}", e);
        }

        TokenError::TokenReplayDetected.into()
    }

    /// Signs a fresh token for `family_id` and builds its record
    fn mint(
        &self,
        subject: &SubjectClaims,
        family_id: Uuid,
    ) -> Result<(IssuedRefreshToken, RefreshTokenRecord), DomainError> {
        subject.validate()?;

        let now = self.clock.now();
        let token_id = Uuid::new_v4();
        let expires_at = now + self.validity;

        let claims = RefreshClaims::new(
            subject,
            token_id,
            family_id,
            now,
            expires_at,
            &self.issuer,
            &self.audience,
        );
        let token = self.codec.encode(&claims)?;
        let record = RefreshTokenRecord::from_claims(&claims, now, expires_at);

        Ok((
            IssuedRefreshToken {
                token,
                token_id,
                family_id,
                expires_at,
            },
            record,
        ))
    }

    async fn purge(&self, token_id: Uuid) {
        if let Err(e) = self.repository.delete(token_id).await {
            debug!(token_id = %token_id, "Failed to delete expired refresh token: {}", e);
        }
    }
}

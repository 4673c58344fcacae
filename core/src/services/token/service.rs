//! Session service: login, refresh, authenticate and logout on top of the
//! revocation registry and the rotation manager

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::entities::{AccessClaims, RevocationReason, SubjectClaims, TokenKind, TokenPair};
use crate::errors::{DomainError, TokenError};
use crate::repositories::{RefreshTokenRepository, RevocationRepository};
use crate::services::clock::Clock;

use super::codec::TokenCodec;
use super::config::TokenServiceConfig;
use super::revocation::AccessTokenRevocationRegistry;
use super::rotation::RefreshTokenRotationManager;

/// Counts from a subject-wide revocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubjectRevocation {
    /// Revocation entries re-labelled as security incident
    pub access_entries: usize,
    /// Refresh tokens revoked
    pub refresh_tokens: usize,
}

/// Service for managing session tokens
pub struct SessionService<RT: RefreshTokenRepository, RV: RevocationRepository> {
    config: TokenServiceConfig,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    registry: Arc<AccessTokenRevocationRegistry<RV>>,
    rotation: Arc<RefreshTokenRotationManager<RT>>,
}

impl<RT: RefreshTokenRepository, RV: RevocationRepository> SessionService<RT, RV> {
    /// Creates a new session service
    ///
    /// # Arguments
    ///
    /// * `refresh_tokens` - Store for refresh token records
    /// * `revocations` - Store for access token revocation entries
    /// * `config` - Token service configuration
    /// * `clock` - Time source shared by every component
    ///
    /// # Returns
    ///
    /// A new `SessionService` or an error if the configuration is unusable
    pub fn new(
        refresh_tokens: Arc<RT>,
        revocations: Arc<RV>,
        config: TokenServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let codec = Arc::new(TokenCodec::new(&config)?);

        let registry = Arc::new(AccessTokenRevocationRegistry::new(
            revocations,
            Arc::clone(&codec),
            Arc::clone(&clock),
            &config,
        ));
        let rotation = Arc::new(RefreshTokenRotationManager::new(
            refresh_tokens,
            Arc::clone(&codec),
            Arc::clone(&clock),
            &config,
        ));

        Ok(Self {
            config,
            codec,
            clock,
            registry,
            rotation,
        })
    }

    pub fn registry(&self) -> &Arc<AccessTokenRevocationRegistry<RV>> {
        &self.registry
    }

    pub fn rotation(&self) -> &Arc<RefreshTokenRotationManager<RT>> {
        &self.rotation
    }

    /// Starts a session after a successful login
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - Access token plus the first refresh token of a new family
    /// * `Err(DomainError::Validation)` - Subject id empty or too long
    /// * `Err(DomainError)` - Signing or storage failed
    pub async fn start_session(&self, subject: &SubjectClaims) -> Result<TokenPair, DomainError> {
        subject.validate()?;
        let access_token = self.issue_access_token(subject)?;
        let refresh = self.rotation.issue(subject, None).await?;

        info!(
            subject_id = %subject.subject_id,
            subject_type = %subject.subject_type,
            family_id = %refresh.family_id,
            "Session started"
        );

        Ok(self.token_pair(access_token, refresh.token, refresh.family_id))
    }

    /// Exchanges a refresh token for a new token pair
    ///
    /// Errors are those of [`RefreshTokenRotationManager::rotate`]; all of
    /// them except `StorageFailure` require a fresh login.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let rotated = self.rotation.rotate(refresh_token).await?;
        let access_token = self.issue_access_token(&rotated.claims)?;

        Ok(self.token_pair(access_token, rotated.token, rotated.family_id))
    }

    /// Verifies an access token and checks it has not been revoked
    ///
    /// # Returns
    ///
    /// * `Ok(AccessClaims)` - Claims that can be trusted
    /// * `Err(TokenError::InvalidToken)` - Bad signature, wrong kind or not yet valid
    /// * `Err(TokenError::TokenExpired)` - Past `exp`
    /// * `Err(TokenError::TokenRevoked)` - Found in the revocation registry
    pub async fn authenticate(&self, access_token: &str) -> Result<AccessClaims, DomainError> {
        let claims = self.decode_access_token(access_token)?;
        let now = self.clock.now();

        if claims.is_expired_at(now) {
            return Err(TokenError::TokenExpired.into());
        }
        if claims.is_premature_at(now) {
            return Err(TokenError::InvalidToken.into());
        }
        if self.registry.is_revoked(access_token).await {
            debug!(subject_id = %claims.sub, "Rejected revoked access token");
            return Err(TokenError::TokenRevoked.into());
        }

        Ok(claims)
    }

    /// Ends a session (logout)
    ///
    /// The access token is revoked with reason `Logout`. When a refresh token
    /// of the same subject is supplied, its whole family is revoked too. An
    /// unverifiable refresh token is ignored.
    pub async fn end_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), DomainError> {
        // Signature is checked so a forged token cannot revoke for someone else
        let claims = self.decode_access_token(access_token)?;

        self.registry
            .revoke(access_token, &claims.sub, RevocationReason::Logout)
            .await?;

        if let Some(refresh_token) = refresh_token {
            match self.rotation.decode(refresh_token) {
                Ok(refresh_claims) if refresh_claims.sub == claims.sub => {
                    self.rotation.revoke_family(refresh_claims.family_id).await?;
                }
                Ok(refresh_claims) => {
                    warn!(
                        subject_id = %claims.sub,
                        refresh_subject_id = %refresh_claims.sub,
                        "Logout presented a refresh token of another subject, ignoring it"
                    );
                }
                Err(e) => {
                    debug!(subject_id = %claims.sub, "Ignoring unverifiable refresh token on logout: {}", e);
                }
            }
        }

        info!(subject_id = %claims.sub, "Session ended");
        Ok(())
    }

    /// Revokes everything held for a subject after a security incident
    pub async fn revoke_subject(&self, subject_id: &str) -> Result<SubjectRevocation, DomainError> {
        let refresh_tokens = self.rotation.revoke_all_for_subject(subject_id).await?;
        let access_entries = self.registry.revoke_all_for_subject(subject_id).await?;

        warn!(
            subject_id = %subject_id,
            refresh_tokens,
            access_entries,
            "All sessions revoked for subject"
        );

        Ok(SubjectRevocation {
            access_entries,
            refresh_tokens,
        })
    }

    /// Signs a new access token for `subject`
    pub fn issue_access_token(&self, subject: &SubjectClaims) -> Result<String, DomainError> {
        let claims = AccessClaims::new(
            subject,
            self.clock.now(),
            self.config.access_token_ttl(),
            &self.config.issuer,
            &self.config.audience,
        );
        self.codec.encode(&claims)
    }

    fn decode_access_token(&self, access_token: &str) -> Result<AccessClaims, DomainError> {
        let claims: AccessClaims = self.codec.decode(access_token)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::InvalidToken.into());
        }
        Ok(claims)
    }

    fn token_pair(&self, access_token: String, refresh_token: String, family_id: uuid::Uuid) -> TokenPair {
        TokenPair::new(
            access_token,
            refresh_token,
            self.config.access_token_expiry_seconds,
            self.config.refresh_token_expiry_seconds,
            family_id,
        )
    }
}

//! Shared fixtures for the token service tests

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{
    RefreshTokenRecord, RevocationEntry, RevocationReason, SubjectClaims, SubjectType,
};
use crate::errors::DomainError;
use crate::repositories::{
    InMemoryRefreshTokenRepository, InMemoryRevocationRepository, RefreshTokenRepository,
    RevocationRepository,
};
use crate::services::clock::ManualClock;
use crate::services::token::{SessionService, TokenCodec, TokenServiceConfig};

pub const STRONG_SECRET: &str =
    "q8Z!r2Lw#9Tb$vX4mK7&pN1sD6hF3jG0yC5uE@aR8wQ2zB7nM4xV9tL1kJ6iH3oP0";

pub const OTHER_STRONG_SECRET: &str =
    "Xv7#kP2m!Qz9Rw4$Lt8Nb3&Hc6Jd1Fg5@Ys0Ue4Ia9Oq2Wr7Es3Ty8Ui1Op6As5Df";

pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn test_config() -> TokenServiceConfig {
    TokenServiceConfig {
        jwt_secret: STRONG_SECRET.to_string(),
        enforce_strong_secret: true,
        ..Default::default()
    }
}

pub fn customer(id: &str) -> SubjectClaims {
    SubjectClaims::new(id, SubjectType::Customer)
}

pub fn codec(config: &TokenServiceConfig) -> Arc<TokenCodec> {
    Arc::new(TokenCodec::new(config).unwrap())
}

pub type MemorySessionService =
    SessionService<InMemoryRefreshTokenRepository, InMemoryRevocationRepository>;

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenRepository>,
    pub revocations: Arc<InMemoryRevocationRepository>,
    pub service: MemorySessionService,
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: TokenServiceConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(test_start()));
    let refresh_tokens = Arc::new(InMemoryRefreshTokenRepository::new());
    let revocations = Arc::new(InMemoryRevocationRepository::new());
    let service = SessionService::new(
        Arc::clone(&refresh_tokens),
        Arc::clone(&revocations),
        config,
        clock.clone(),
    )
    .unwrap();

    Harness {
        clock,
        refresh_tokens,
        revocations,
        service,
    }
}

fn unreachable_store() -> DomainError {
    DomainError::storage("store unreachable")
}

/// Revocation store that fails every call
pub struct FailingRevocationRepository;

#[async_trait]
impl RevocationRepository for FailingRevocationRepository {
    async fn upsert(&self, _entry: RevocationEntry) -> Result<(), DomainError> {
        Err(unreachable_store())
    }

    async fn find(&self, _fingerprint: &str) -> Result<Option<RevocationEntry>, DomainError> {
        Err(unreachable_store())
    }

    async fn remove(&self, _fingerprint: &str) -> Result<bool, DomainError> {
        Err(unreachable_store())
    }

    async fn mark_subject(&self, _subject_id: &str, _reason: RevocationReason) -> Result<usize, DomainError> {
        Err(unreachable_store())
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<usize, DomainError> {
        Err(unreachable_store())
    }
}

/// In-memory refresh token store with switchable failures
#[derive(Default)]
pub struct FlakyRefreshTokenRepository {
    pub inner: InMemoryRefreshTokenRepository,
    pub fail_insert: AtomicBool,
    pub fail_exchange: AtomicBool,
}

impl FlakyRefreshTokenRepository {
    pub fn set_fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_exchange(&self, fail: bool) {
        self.fail_exchange.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RefreshTokenRepository for FlakyRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(unreachable_store());
        }
        self.inner.insert(record).await
    }

    async fn find_by_token_id(&self, token_id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError> {
        self.inner.find_by_token_id(token_id).await
    }

    async fn exchange(
        &self,
        token_id: Uuid,
        successor: RefreshTokenRecord,
        used_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(unreachable_store());
        }
        self.inner.exchange(token_id, successor, used_at).await
    }

    async fn is_family_revoked(&self, family_id: Uuid) -> Result<bool, DomainError> {
        self.inner.is_family_revoked(family_id).await
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, DomainError> {
        self.inner.revoke(token_id).await
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<usize, DomainError> {
        self.inner.revoke_family(family_id).await
    }

    async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<usize, DomainError> {
        self.inner.revoke_all_for_subject(subject_id).await
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        self.inner.find_by_family(family_id).await
    }

    async fn delete(&self, token_id: Uuid) -> Result<bool, DomainError> {
        self.inner.delete(token_id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.inner.delete_expired(now).await
    }
}

/// In-memory refresh token store whose exchanges take a while
///
/// `before` delays the call before it reaches the store, `after` delays the
/// acknowledgement once the store has applied it.
#[derive(Default)]
pub struct SlowExchangeRepository {
    pub inner: InMemoryRefreshTokenRepository,
    pub before: std::time::Duration,
    pub after: std::time::Duration,
}

#[async_trait]
impl RefreshTokenRepository for SlowExchangeRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        self.inner.insert(record).await
    }

    async fn find_by_token_id(&self, token_id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError> {
        self.inner.find_by_token_id(token_id).await
    }

    async fn exchange(
        &self,
        token_id: Uuid,
        successor: RefreshTokenRecord,
        used_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        tokio::time::sleep(self.before).await;
        let exchanged = self.inner.exchange(token_id, successor, used_at).await;
        tokio::time::sleep(self.after).await;
        exchanged
    }

    async fn is_family_revoked(&self, family_id: Uuid) -> Result<bool, DomainError> {
        self.inner.is_family_revoked(family_id).await
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, DomainError> {
        self.inner.revoke(token_id).await
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<usize, DomainError> {
        self.inner.revoke_family(family_id).await
    }

    async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<usize, DomainError> {
        self.inner.revoke_all_for_subject(subject_id).await
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        self.inner.find_by_family(family_id).await
    }

    async fn delete(&self, token_id: Uuid) -> Result<bool, DomainError> {
        self.inner.delete(token_id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        self.inner.delete_expired(now).await
    }
}

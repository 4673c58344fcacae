use chrono::Duration;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{RefreshClaims, RefreshTokenRecord, SubjectType};
use crate::errors::{DomainError, TokenError};
use crate::repositories::RefreshTokenRepository;
use crate::services::clock::{Clock, ManualClock};
use crate::services::token::RefreshTokenRotationManager;

use super::support::{
    codec, customer, harness, test_config, test_start, FlakyRefreshTokenRepository,
};

fn token_error(result: Result<impl std::fmt::Debug, DomainError>) -> TokenError {
    match result {
        Err(DomainError::Token(err)) => err,
        other => panic!("expected token error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_issue_persists_active_record() {
    let h = harness();
    let issued = h.service.rotation().issue(&customer("u1"), None).await.unwrap();

    let record = h.refresh_tokens.find_by_token_id(issued.token_id).await.unwrap().unwrap();
    assert_eq!(record.family_id, issued.family_id);
    assert_eq!(record.subject_id, "u1");
    assert_eq!(record.subject_type, SubjectType::Customer);
    assert!(record.is_active_at(test_start()));
    assert_eq!(record.expires_at, test_start() + Duration::days(30));
    assert_eq!(issued.expires_at, record.expires_at);

    let claims = h.service.rotation().decode(&issued.token).unwrap();
    assert_eq!(claims.token_id, issued.token_id);
    assert_eq!(claims.family_id, issued.family_id);
}

#[tokio::test]
async fn test_issue_without_family_mints_fresh_family() {
    let h = harness();
    let mut families = HashSet::new();

    for _ in 0..10 {
        let issued = h.service.rotation().issue(&customer("u1"), None).await.unwrap();
        assert!(families.insert(issued.family_id));
    }
}

#[tokio::test]
async fn test_issue_reuses_existing_family() {
    let h = harness();
    let family_id = Uuid::new_v4();

    let issued = h
        .service
        .rotation()
        .issue(&customer("u1"), Some(family_id))
        .await
        .unwrap();

    assert_eq!(issued.family_id, family_id);
}

#[tokio::test]
async fn test_rotate_once_then_replay() {
    let h = harness();
    let rotation = h.service.rotation();
    let issued = rotation.issue(&customer("u1"), None).await.unwrap();

    let rotated = rotation.rotate(&issued.token).await.unwrap();
    assert_eq!(rotated.family_id, issued.family_id);
    assert_ne!(rotated.token_id, issued.token_id);
    assert_eq!(rotated.claims, customer("u1"));

    let used = h.refresh_tokens.find_by_token_id(issued.token_id).await.unwrap().unwrap();
    assert!(used.is_revoked);
    assert_eq!(used.last_used_at, Some(test_start()));

    assert_eq!(
        token_error(rotation.rotate(&issued.token).await),
        TokenError::TokenReplayDetected
    );
}

#[tokio::test]
async fn test_login_rotate_replay_poisons_family() {
    let h = harness();
    let rotation = h.service.rotation();
    let subject = customer("u1");

    let token1 = rotation.issue(&subject, None).await.unwrap();
    let f1 = token1.family_id;

    let token2 = rotation.rotate(&token1.token).await.unwrap();
    assert_eq!(token2.family_id, f1);

    assert_eq!(
        token_error(rotation.rotate(&token1.token).await),
        TokenError::TokenReplayDetected
    );
    // The legitimate holder is locked out too
    assert_eq!(
        token_error(rotation.rotate(&token2.token).await),
        TokenError::TokenReplayDetected
    );

    let family = rotation.family(f1).await.unwrap();
    assert_eq!(family.len(), 2);
    assert!(family.iter().all(|r| r.is_revoked));
}

#[tokio::test]
async fn test_rotation_chain_keeps_one_active_token() {
    let h = harness();
    let rotation = h.service.rotation();
    let first = rotation.issue(&customer("u1"), None).await.unwrap();

    let mut tokens = vec![first.token.clone()];
    let mut current = first.token;
    for _ in 0..3 {
        h.clock.advance(Duration::minutes(20));
        let rotated = rotation.rotate(&current).await.unwrap();
        assert_eq!(rotated.family_id, first.family_id);
        current = rotated.token;
        tokens.push(current.clone());
    }

    let family = rotation.family(first.family_id).await.unwrap();
    assert_eq!(family.len(), 4);
    let active: Vec<_> = family.iter().filter(|r| r.is_active_at(h.clock.now())).collect();
    assert_eq!(active.len(), 1);

    // Replaying any ancestor poisons every member
    assert_eq!(
        token_error(rotation.rotate(&tokens[1]).await),
        TokenError::TokenReplayDetected
    );
    for token in &tokens {
        assert_eq!(
            token_error(rotation.rotate(token).await),
            TokenError::TokenReplayDetected
        );
    }
}

#[tokio::test]
async fn test_rotate_unknown_token() {
    let h = harness();
    let rotation = h.service.rotation();
    let issued = rotation.issue(&customer("u1"), None).await.unwrap();
    h.refresh_tokens.delete(issued.token_id).await.unwrap();

    assert_eq!(
        token_error(rotation.rotate(&issued.token).await),
        TokenError::TokenNotFound
    );
}

#[tokio::test]
async fn test_rotate_expired_token_purges_record() {
    let h = harness();
    let rotation = h.service.rotation();
    let issued = rotation.issue(&customer("u1"), None).await.unwrap();

    h.clock.advance(Duration::days(30));

    assert_eq!(
        token_error(rotation.rotate(&issued.token).await),
        TokenError::TokenExpired
    );
    assert!(h.refresh_tokens.find_by_token_id(issued.token_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rotate_expired_record() {
    let h = harness();
    let config = test_config();
    let now = test_start();
    let token_id = Uuid::new_v4();
    let family_id = Uuid::new_v4();

    // Signed window still open, stored window already closed
    let claims = RefreshClaims::new(
        &customer("u1"),
        token_id,
        family_id,
        now,
        now + Duration::days(30),
        &config.issuer,
        &config.audience,
    );
    let token = codec(&config).encode(&claims).unwrap();
    h.refresh_tokens
        .insert(RefreshTokenRecord::new(
            token_id,
            family_id,
            "u1",
            SubjectType::Customer,
            now - Duration::days(1),
            now - Duration::seconds(1),
        ))
        .await
        .unwrap();

    assert_eq!(
        token_error(h.service.rotation().rotate(&token).await),
        TokenError::TokenExpired
    );
    assert!(h.refresh_tokens.is_empty().await);
}

#[tokio::test]
async fn test_rotate_rejects_invalid_tokens() {
    let h = harness();
    let rotation = h.service.rotation();
    let access = h.service.issue_access_token(&customer("u1")).unwrap();
    let issued = rotation.issue(&customer("u1"), None).await.unwrap();
    let mut tampered = issued.token.clone();
    tampered.pop();

    for presented in [access.as_str(), tampered.as_str(), "garbage", ""] {
        assert_eq!(
            token_error(rotation.rotate(presented).await),
            TokenError::InvalidToken
        );
    }

    // Rejected tokens never consume the stored record
    let record = h.refresh_tokens.find_by_token_id(issued.token_id).await.unwrap().unwrap();
    assert!(!record.is_revoked);
}

fn flaky_manager() -> (
    Arc<FlakyRefreshTokenRepository>,
    RefreshTokenRotationManager<FlakyRefreshTokenRepository>,
) {
    let config = test_config();
    let repository = Arc::new(FlakyRefreshTokenRepository::default());
    let manager = RefreshTokenRotationManager::new(
        Arc::clone(&repository),
        codec(&config),
        Arc::new(ManualClock::new(test_start())),
        &config,
    );
    (repository, manager)
}

#[tokio::test]
async fn test_storage_failure_during_exchange_leaves_token_usable() {
    let (repository, manager) = flaky_manager();
    let issued = manager.issue(&customer("u1"), None).await.unwrap();

    repository.set_fail_exchange(true);
    assert!(matches!(
        token_error(manager.rotate(&issued.token).await),
        TokenError::StorageFailure { .. }
    ));
    assert_eq!(repository.inner.len().await, 1);
    let record = repository.inner.find_by_token_id(issued.token_id).await.unwrap().unwrap();
    assert!(!record.is_revoked);
    assert!(record.last_used_at.is_none());

    // A retry after recovery is a normal rotation, not a replay
    repository.set_fail_exchange(false);
    let rotated = manager.rotate(&issued.token).await.unwrap();
    assert_eq!(rotated.family_id, issued.family_id);
    assert!(!repository.inner.is_family_revoked(issued.family_id).await.unwrap());
}

#[tokio::test]
async fn test_insert_failure_does_not_affect_rotation() {
    let (repository, manager) = flaky_manager();
    let issued = manager.issue(&customer("u1"), None).await.unwrap();

    // The successor is written by the exchange, not by a separate insert
    repository.set_fail_insert(true);
    assert!(manager.rotate(&issued.token).await.is_ok());
}

#[tokio::test]
async fn test_issue_refuses_revoked_family() {
    let h = harness();
    let rotation = h.service.rotation();
    let first = rotation.issue(&customer("u1"), None).await.unwrap();
    rotation.revoke_family(first.family_id).await.unwrap();

    let result = rotation.issue(&customer("u1"), Some(first.family_id)).await;
    assert!(matches!(result, Err(DomainError::Validation { .. })));
    assert_eq!(rotation.family(first.family_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_storage_failure_on_issue() {
    let (repository, manager) = flaky_manager();

    repository.set_fail_insert(true);
    assert!(matches!(
        token_error(manager.issue(&customer("u1"), None).await),
        TokenError::StorageFailure { .. }
    ));
    assert!(repository.inner.is_empty().await);
}

#[tokio::test]
async fn test_explicit_revocations() {
    let h = harness();
    let rotation = h.service.rotation();
    let a = rotation.issue(&customer("u1"), None).await.unwrap();
    let b = rotation.issue(&customer("u1"), Some(a.family_id)).await.unwrap();
    let c = rotation.issue(&customer("u1"), None).await.unwrap();
    let other = rotation.issue(&customer("u2"), None).await.unwrap();

    assert!(rotation.revoke(a.token_id).await.unwrap());
    assert!(!rotation.revoke(a.token_id).await.unwrap());
    assert!(!rotation.revoke(Uuid::new_v4()).await.unwrap());

    assert_eq!(rotation.revoke_family(a.family_id).await.unwrap(), 1);
    assert_eq!(
        token_error(rotation.rotate(&b.token).await),
        TokenError::TokenReplayDetected
    );

    assert_eq!(rotation.revoke_all_for_subject("u1").await.unwrap(), 1);
    assert_eq!(
        token_error(rotation.rotate(&c.token).await),
        TokenError::TokenReplayDetected
    );

    assert!(rotation.rotate(&other.token).await.is_ok());
}

#[tokio::test]
async fn test_sweep_expired_records() {
    let h = harness();
    let rotation = h.service.rotation();
    rotation.issue(&customer("u1"), None).await.unwrap();
    h.clock.advance(Duration::days(29));
    rotation.issue(&customer("u2"), None).await.unwrap();

    h.clock.advance(Duration::days(1));
    assert_eq!(rotation.sweep_expired().await.unwrap(), 1);
    assert_eq!(rotation.sweep_expired().await.unwrap(), 0);
    assert_eq!(h.refresh_tokens.len().await, 1);
}

use chrono::{Duration, Utc};

use crate::domain::entities::{RevocationEntry, RevocationReason};
use crate::repositories::revocation::{InMemoryRevocationRepository, RevocationRepository};

fn entry(fingerprint: &str, subject_id: &str, ttl: Duration) -> RevocationEntry {
    let now = Utc::now();
    RevocationEntry::new(
        fingerprint.to_string(),
        subject_id,
        now + ttl,
        RevocationReason::Logout,
        now,
    )
}

#[tokio::test]
async fn test_upsert_find_remove() {
    let repo = InMemoryRevocationRepository::new();
    let e = entry("fp-1", "u1", Duration::minutes(10));

    repo.upsert(e.clone()).await.unwrap();
    assert_eq!(repo.find("fp-1").await.unwrap(), Some(e));
    assert!(repo.find("fp-2").await.unwrap().is_none());

    assert!(repo.remove("fp-1").await.unwrap());
    assert!(!repo.remove("fp-1").await.unwrap());
}

#[tokio::test]
async fn test_upsert_replaces() {
    let repo = InMemoryRevocationRepository::new();
    repo.upsert(entry("fp-1", "u1", Duration::minutes(10))).await.unwrap();

    let mut replacement = entry("fp-1", "u1", Duration::minutes(20));
    replacement.reason = RevocationReason::SecurityIncident;
    repo.upsert(replacement.clone()).await.unwrap();

    assert_eq!(repo.len().await, 1);
    assert_eq!(repo.find("fp-1").await.unwrap(), Some(replacement));
}

#[tokio::test]
async fn test_mark_subject() {
    let repo = InMemoryRevocationRepository::new();
    repo.upsert(entry("fp-1", "u1", Duration::minutes(10))).await.unwrap();
    repo.upsert(entry("fp-2", "u1", Duration::minutes(10))).await.unwrap();
    repo.upsert(entry("fp-3", "u2", Duration::minutes(10))).await.unwrap();

    let updated = repo
        .mark_subject("u1", RevocationReason::SecurityIncident)
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(repo.len().await, 3);

    let other = repo.find("fp-3").await.unwrap().unwrap();
    assert_eq!(other.reason, RevocationReason::Logout);
}

#[tokio::test]
async fn test_delete_expired() {
    let repo = InMemoryRevocationRepository::new();
    repo.upsert(entry("live", "u1", Duration::minutes(10))).await.unwrap();
    repo.upsert(entry("stale", "u1", Duration::minutes(-10))).await.unwrap();

    assert_eq!(repo.delete_expired(Utc::now()).await.unwrap(), 1);
    assert_eq!(repo.delete_expired(Utc::now()).await.unwrap(), 0);
    assert!(repo.find("live").await.unwrap().is_some());
}

//! Revocation repository trait for revoked access token entries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{RevocationEntry, RevocationReason};
use crate::errors::DomainError;

/// Repository trait for access token revocation entries, keyed by fingerprint
///
/// Implementations never see raw tokens. Writes must be visible to the next
/// `find` on any instance sharing the store.
#[async_trait]
pub trait RevocationRepository: Send + Sync {
    /// Insert or replace the entry for `entry.token_fingerprint`
    async fn upsert(&self, entry: RevocationEntry) -> Result<(), DomainError>;

    /// Look up an entry by fingerprint
    ///
    /// Expired entries may still be returned; callers compare `expires_at`
    /// with their own clock.
    async fn find(&self, fingerprint: &str) -> Result<Option<RevocationEntry>, DomainError>;

    /// Remove an entry, returning whether it existed
    async fn remove(&self, fingerprint: &str) -> Result<bool, DomainError>;

    /// Set `reason` on every entry held for `subject_id`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of entries updated
    async fn mark_subject(&self, subject_id: &str, reason: RevocationReason) -> Result<usize, DomainError>;

    /// Delete entries with `expires_at <= now`, returning how many were removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;
}

//! Refresh token repository trait defining the interface for rotation state persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::RefreshTokenRecord;
use crate::errors::DomainError;

/// Repository trait for refresh token records
///
/// Every instance behind a load balancer must see the same store, so
/// production implementations are backed by a shared database. All mutation
/// of refresh token state goes through this trait.
///
/// # Atomicity
/// `exchange` consumes the presented record and stores its successor as one
/// unit: either both writes happen or neither does. Two callers racing on the
/// same token id must never both observe `true`.
///
/// # Family revocation
/// `revoke_family` and `revoke_all_for_subject` leave a durable marker for
/// each affected family. Once a family is marked, neither `insert` nor
/// `exchange` may add a record to it.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a newly issued record
    ///
    /// # Returns
    /// * `Ok(())` - Record stored
    /// * `Err(DomainError::Validation)` - Duplicate token id, or the family is revoked
    /// * `Err(DomainError)` - Store failure
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError>;

    /// Find a record by the token id embedded in the token payload
    async fn find_by_token_id(&self, token_id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError>;

    /// Atomically consume an unrevoked record and store its successor
    ///
    /// # Arguments
    /// * `token_id` - Record to consume, stamped with `used_at`
    /// * `successor` - Next record of the same family
    /// * `used_at` - Stored as `last_used_at`
    ///
    /// # Returns
    /// * `Ok(true)` - Presented record consumed and successor stored
    /// * `Ok(false)` - Presented record absent or already revoked, or its
    ///   family is revoked; nothing was written
    /// * `Err(DomainError)` - Nothing was written
    async fn exchange(
        &self,
        token_id: Uuid,
        successor: RefreshTokenRecord,
        used_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Whether the family carries a revocation marker
    async fn is_family_revoked(&self, family_id: Uuid) -> Result<bool, DomainError>;

    /// Revoke a single record
    ///
    /// # Returns
    /// * `Ok(true)` - The record went from active to revoked
    /// * `Ok(false)` - Absent or already revoked
    async fn revoke(&self, token_id: Uuid) -> Result<bool, DomainError>;

    /// Mark the family revoked and revoke its unrevoked records
    ///
    /// Returns how many records changed.
    async fn revoke_family(&self, family_id: Uuid) -> Result<usize, DomainError>;

    /// Mark every family of a subject revoked and revoke their records
    async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<usize, DomainError>;

    /// All records of a family, oldest first
    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError>;

    /// Delete a single record, returning whether it existed
    async fn delete(&self, token_id: Uuid) -> Result<bool, DomainError>;

    /// Delete records with `expires_at <= now`
    ///
    /// Family markers are dropped once no record of the family remains.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records deleted
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;
}

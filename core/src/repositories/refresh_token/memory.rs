//! In-memory refresh token store for single-instance deployments and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::RefreshTokenRecord;
use crate::errors::DomainError;

use super::r#trait::RefreshTokenRepository;

#[derive(Default)]
struct Store {
    records: HashMap<Uuid, RefreshTokenRecord>,
    revoked_families: HashSet<Uuid>,
}

impl Store {
    /// Validates a record before it joins the map
    fn check_insertable(&self, record: &RefreshTokenRecord) -> Result<(), DomainError> {
        if self.records.contains_key(&record.token_id) {
            return Err(DomainError::Validation {
                message: format!("Refresh token {} already exists", record.token_id),
            });
        }
        if self.revoked_families.contains(&record.family_id) {
            return Err(DomainError::Validation {
                message: format!("Refresh token family {} is revoked", record.family_id),
            });
        }
        Ok(())
    }
}

/// Refresh token repository backed by a process-local map
///
/// Not suitable behind a load balancer: each process would hold its own
/// view of token state. Cloning shares the underlying map.
#[derive(Clone)]
pub struct InMemoryRefreshTokenRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryRefreshTokenRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
        }
    }

    /// Number of stored records, revoked ones included
    pub async fn len(&self) -> usize {
        self.store.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.records.is_empty()
    }

    /// Number of families carrying a revocation marker
    pub async fn revoked_family_count(&self) -> usize {
        self.store.read().await.revoked_families.len()
    }
}

impl Default for InMemoryRefreshTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        store.check_insertable(&record)?;
        store.records.insert(record.token_id, record);
        Ok(())
    }

    async fn find_by_token_id(&self, token_id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let store = self.store.read().await;
        Ok(store.records.get(&token_id).cloned())
    }

    async fn exchange(
        &self,
        token_id: Uuid,
        successor: RefreshTokenRecord,
        used_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        // Check, consume and insert under one write guard
        let mut store = self.store.write().await;

        let consumable = match store.records.get(&token_id) {
            Some(record) => !record.is_revoked && !store.revoked_families.contains(&record.family_id),
            None => false,
        };
        if !consumable || store.revoked_families.contains(&successor.family_id) {
            return Ok(false);
        }
        store.check_insertable(&successor)?;

        if let Some(record) = store.records.get_mut(&token_id) {
            record.mark_used(used_at);
        }
        store.records.insert(successor.token_id, successor);
        Ok(true)
    }

    async fn is_family_revoked(&self, family_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.store.read().await.revoked_families.contains(&family_id))
    }

    async fn revoke(&self, token_id: Uuid) -> Result<bool, DomainError> {
        let mut store = self.store.write().await;

        match store.records.get_mut(&token_id) {
            Some(record) if !record.is_revoked => {
                record.revoke();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_family(&self, family_id: Uuid) -> Result<usize, DomainError> {
        let mut store = self.store.write().await;
        store.revoked_families.insert(family_id);

        let mut count = 0;
        for record in store
            .records
            .values_mut()
            .filter(|r| r.family_id == family_id && !r.is_revoked)
        {
            record.revoke();
            count += 1;
        }

        Ok(count)
    }

    async fn revoke_all_for_subject(&self, subject_id: &str) -> Result<usize, DomainError> {
        let mut guard = self.store.write().await;
        let store = &mut *guard;
        let mut count = 0;

        for record in store.records.values_mut().filter(|r| r.subject_id == subject_id) {
            store.revoked_families.insert(record.family_id);
            if !record.is_revoked {
                record.revoke();
                count += 1;
            }
        }

        Ok(count)
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        let store = self.store.read().await;
        let mut family: Vec<RefreshTokenRecord> = store
            .records
            .values()
            .filter(|r| r.family_id == family_id)
            .cloned()
            .collect();
        family.sort_by_key(|r| r.issued_at);
        Ok(family)
    }

    async fn delete(&self, token_id: Uuid) -> Result<bool, DomainError> {
        let mut store = self.store.write().await;
        Ok(store.records.remove(&token_id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut guard = self.store.write().await;
        let store = &mut *guard;

        let before = store.records.len();
        store.records.retain(|_, r| !r.is_expired_at(now));
        let removed = before - store.records.len();

        let records = &store.records;
        store
            .revoked_families
            .retain(|family_id| records.values().any(|r| r.family_id == *family_id));

        Ok(removed)
    }
}

//! In-memory revocation registry store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::{RevocationEntry, RevocationReason};
use crate::errors::DomainError;

use super::r#trait::RevocationRepository;

/// Revocation repository backed by a process-local map
#[derive(Clone)]
pub struct InMemoryRevocationRepository {
    entries: Arc<RwLock<HashMap<String, RevocationEntry>>>,
}

impl InMemoryRevocationRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of entries held, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryRevocationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationRepository for InMemoryRevocationRepository {
    async fn upsert(&self, entry: RevocationEntry) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.token_fingerprint.clone(), entry);
        Ok(())
    }

    async fn find(&self, fingerprint: &str) -> Result<Option<RevocationEntry>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries.get(fingerprint).cloned())
    }

    async fn remove(&self, fingerprint: &str) -> Result<bool, DomainError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(fingerprint).is_some())
    }

    async fn mark_subject(&self, subject_id: &str, reason: RevocationReason) -> Result<usize, DomainError> {
        let mut entries = self.entries.write().await;
        let mut count = 0;

        for entry in entries.values_mut().filter(|e| e.subject_id == subject_id) {
            entry.reason = reason;
            count += 1;
        }

        Ok(count)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        Ok(before - entries.len())
    }
}

//! Redis implementation of the revocation registry store
//!
//! Key layout (all keys carry the configured prefix):
//! - `revoked:{fingerprint}` - entry JSON, expiring with the token
//! - `revoked:by-expiry` - sorted set of fingerprints scored by expiry timestamp
//! - `revoked:subject:{subject_id}` - set of fingerprints held for a subject
//! - `revoked:owner` - hash of fingerprint to subject id
//!
//! The owner hash outlives the entry key, so the sweep can still find the
//! subject set of an entry whose TTL has already lapsed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use bc_core::domain::entities::{RevocationEntry, RevocationReason};
use bc_core::errors::DomainError;
use bc_core::repositories::RevocationRepository;

use super::redis_client::RedisClient;
use crate::InfrastructureError;

/// Revocation store shared by every server instance through Redis
#[derive(Clone)]
pub struct RedisRevocationRepository {
    client: RedisClient,
}

impl RedisRevocationRepository {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn entry_key(&self, fingerprint: &str) -> String {
        self.client.make_key(&format!("revoked:{}", fingerprint))
    }

    fn expiry_index_key(&self) -> String {
        self.client.make_key("revoked:by-expiry")
    }

    fn owner_key(&self) -> String {
        self.client.make_key("revoked:owner")
    }

    fn subject_key(&self, subject_id: &str) -> String {
        self.client.make_key(&format!("revoked:subject:{}", subject_id))
    }

    /// Store an entry and index it, in one MULTI/EXEC block
    async fn write_entry(&self, entry: &RevocationEntry) -> Result<(), InfrastructureError> {
        let payload = serde_json::to_string(entry)?;
        let entry_key = self.entry_key(&entry.token_fingerprint);
        let index_key = self.expiry_index_key();
        let subject_key = self.subject_key(&entry.subject_id);
        let owner_key = self.owner_key();
        let subject_id = entry.subject_id.clone();
        let fingerprint = entry.token_fingerprint.clone();
        let score = entry.expires_at.timestamp();
        let ttl = ttl_seconds(entry.expires_at, Utc::now());

        self.client
            .execute_with_retry(|mut conn| {
                let payload = payload.clone();
                let entry_key = entry_key.clone();
                let index_key = index_key.clone();
                let subject_key = subject_key.clone();
                let owner_key = owner_key.clone();
                let subject_id = subject_id.clone();
                let fingerprint = fingerprint.clone();

                Box::pin(async move {
                    let mut pipe = redis::pipe();
                    pipe.atomic()
                        .set_ex(&entry_key, payload, ttl)
                        .ignore()
                        .zadd(&index_key, &fingerprint, score)
                        .ignore()
                        .sadd(&subject_key, &fingerprint)
                        .ignore()
                        .hset(&owner_key, &fingerprint, &subject_id)
                        .ignore();
                    pipe.query_async::<_, ()>(&mut conn).await
                })
            })
            .await?;

        Ok(())
    }

    /// Drop an entry together with its index memberships
    ///
    /// Returns whether the entry key itself still existed.
    async fn drop_entry(
        &self,
        fingerprint: &str,
        subject_id: Option<&str>,
    ) -> Result<bool, InfrastructureError> {
        let entry_key = self.entry_key(fingerprint);
        let index_key = self.expiry_index_key();
        let owner_key = self.owner_key();
        let subject_key = subject_id.map(|id| self.subject_key(id));
        let fingerprint = fingerprint.to_string();

        let deleted: u32 = self
            .client
            .execute_with_retry(|mut conn| {
                let entry_key = entry_key.clone();
                let index_key = index_key.clone();
                let owner_key = owner_key.clone();
                let subject_key = subject_key.clone();
                let fingerprint = fingerprint.clone();

                Box::pin(async move {
                    let mut pipe = redis::pipe();
                    pipe.atomic()
                        .del(&entry_key)
                        .zrem(&index_key, &fingerprint)
                        .ignore()
                        .hdel(&owner_key, &fingerprint)
                        .ignore();
                    if let Some(subject_key) = &subject_key {
                        pipe.srem(subject_key, &fingerprint).ignore();
                    }
                    let result: redis::RedisResult<(u32,)> = pipe.query_async(&mut conn).await;
                    result.map(|(deleted,)| deleted)
                })
            })
            .await?;

        Ok(deleted > 0)
    }

    async fn read_entry(&self, fingerprint: &str) -> Result<Option<RevocationEntry>, InfrastructureError> {
        match self.client.get(&self.entry_key(fingerprint)).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Subject recorded for a fingerprint, available after the entry key expires
    async fn owner_of(&self, fingerprint: &str) -> Result<Option<String>, InfrastructureError> {
        let owner_key = self.owner_key();
        let fingerprint = fingerprint.to_string();

        let owner = self
            .client
            .execute_with_retry(|mut conn| {
                let owner_key = owner_key.clone();
                let fingerprint = fingerprint.clone();

                Box::pin(async move {
                    redis::cmd("HGET")
                        .arg(&owner_key)
                        .arg(&fingerprint)
                        .query_async::<_, Option<String>>(&mut conn)
                        .await
                })
            })
            .await?;

        Ok(owner)
    }

    async fn fingerprints_expired_by(&self, now: DateTime<Utc>) -> Result<Vec<String>, InfrastructureError> {
        let index_key = self.expiry_index_key();
        let max_score = now.timestamp();

        let fingerprints = self
            .client
            .execute_with_retry(|mut conn| {
                let index_key = index_key.clone();

                Box::pin(async move {
                    redis::cmd("ZRANGEBYSCORE")
                        .arg(&index_key)
                        .arg("-inf")
                        .arg(max_score)
                        .query_async::<_, Vec<String>>(&mut conn)
                        .await
                })
            })
            .await?;

        Ok(fingerprints)
    }

    pub(crate) async fn subject_fingerprints(&self, subject_id: &str) -> Result<Vec<String>, InfrastructureError> {
        let subject_key = self.subject_key(subject_id);

        let fingerprints = self
            .client
            .execute_with_retry(|mut conn| {
                let subject_key = subject_key.clone();

                Box::pin(async move {
                    redis::cmd("SMEMBERS")
                        .arg(&subject_key)
                        .query_async::<_, Vec<String>>(&mut conn)
                        .await
                })
            })
            .await?;

        Ok(fingerprints)
    }
}

/// Seconds until `expires_at`, at least one so Redis accepts the TTL
pub(crate) fn ttl_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (expires_at - now).num_seconds().max(1) as u64
}

#[async_trait]
impl RevocationRepository for RedisRevocationRepository {
    async fn upsert(&self, entry: RevocationEntry) -> Result<(), DomainError> {
        self.write_entry(&entry).await?;
        Ok(())
    }

    async fn find(&self, fingerprint: &str) -> Result<Option<RevocationEntry>, DomainError> {
        Ok(self.read_entry(fingerprint).await?)
    }

    async fn remove(&self, fingerprint: &str) -> Result<bool, DomainError> {
        let subject_id = self.owner_of(fingerprint).await?;
        Ok(self.drop_entry(fingerprint, subject_id.as_deref()).await?)
    }

    async fn mark_subject(&self, subject_id: &str, reason: RevocationReason) -> Result<usize, DomainError> {
        let mut updated = 0;

        for fingerprint in self.subject_fingerprints(subject_id).await? {
            match self.read_entry(&fingerprint).await? {
                Some(mut entry) => {
                    entry.reason = reason;
                    self.write_entry(&entry).await?;
                    updated += 1;
                }
                None => {
                    // Entry expired through its TTL; clean up the indexes
                    self.drop_entry(&fingerprint, Some(subject_id)).await?;
                }
            }
        }

        info!(subject_id = %subject_id, updated, "Revocation entries relabelled");
        Ok(updated)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut removed = 0;

        for fingerprint in self.fingerprints_expired_by(now).await? {
            let subject_id = self.owner_of(&fingerprint).await?;
            if subject_id.is_none() {
                warn!(fingerprint = %fingerprint, "Swept revocation entry has no recorded owner");
            }
            self.drop_entry(&fingerprint, subject_id.as_deref()).await?;
            removed += 1;
        }

        debug!(removed, "Expired revocation entries swept from Redis");
        Ok(removed)
    }
}

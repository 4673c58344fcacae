//! Stored refresh token state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subject::SubjectType;
use super::token::RefreshClaims;

/// Refresh token record persisted by the rotation manager
///
/// A record moves from issued (active) to revoked exactly once, either by
/// being exchanged for a successor or by explicit revocation. Expiry is
/// derived from `expires_at` and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Identifier embedded in the token payload
    pub token_id: Uuid,

    /// Family shared by every rotation of the same login
    pub family_id: Uuid,

    /// User ID this token belongs to
    pub subject_id: String,

    pub subject_type: SubjectType,

    /// Set once the token has been exchanged or explicitly revoked
    pub is_revoked: bool,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// When the token was exchanged for its successor
    pub last_used_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Creates an issued record
    pub fn new(
        token_id: Uuid,
        family_id: Uuid,
        subject_id: impl Into<String>,
        subject_type: SubjectType,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_id,
            family_id,
            subject_id: subject_id.into(),
            subject_type,
            is_revoked: false,
            issued_at,
            expires_at,
            last_used_at: None,
        }
    }

    /// Creates the record backing a signed refresh token
    pub fn from_claims(claims: &RefreshClaims, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self::new(
            claims.token_id,
            claims.family_id,
            claims.sub.clone(),
            claims.subject_type,
            issued_at,
            expires_at,
        )
    }

    /// Checks if the record has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active means neither revoked nor expired
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && !self.is_expired_at(now)
    }

    /// Marks the record revoked without recording a use
    pub fn revoke(&mut self) {
        self.is_revoked = true;
    }

    /// Marks the record exchanged for its successor
    pub fn mark_used(&mut self, used_at: DateTime<Utc>) {
        self.is_revoked = true;
        self.last_used_at = Some(used_at);
    }
}

//! Access token revocation entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an access token was revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    Logout,
    SecurityIncident,
    NaturalExpiry,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::Logout => "logout",
            RevocationReason::SecurityIncident => "security_incident",
            RevocationReason::NaturalExpiry => "natural_expiry",
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A revoked access token, keyed by fingerprint
///
/// The raw token is never stored. The entry is moot once `expires_at`
/// passes because the token itself is no longer accepted by then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// SHA-256 hex digest of the raw access token
    pub token_fingerprint: String,

    /// User the token belonged to
    pub subject_id: String,

    /// Mirrors the token's own expiry
    pub expires_at: DateTime<Utc>,

    pub reason: RevocationReason,

    pub revoked_at: DateTime<Utc>,
}

impl RevocationEntry {
    pub fn new(
        token_fingerprint: String,
        subject_id: impl Into<String>,
        expires_at: DateTime<Utc>,
        reason: RevocationReason,
        revoked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_fingerprint,
            subject_id: subject_id.into(),
            expires_at,
            reason,
            revoked_at,
        }
    }

    /// Checks if the entry is moot at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

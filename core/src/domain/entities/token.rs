//! Token payloads and the values handed back to callers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subject::{SubjectClaims, SubjectType};

/// Access token expiration time (15 minutes)
pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh token expiration time (30 days)
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// Revocation horizon for access tokens that carry no `exp` claim
pub const DEFAULT_REVOCATION_HORIZON_DAYS: i64 = 7;

/// JWT issuer
pub const JWT_ISSUER: &str = "beautycort";

/// JWT audience
pub const JWT_AUDIENCE: &str = "beautycort-api";

/// Distinguishes access from refresh payloads so one cannot stand in for the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims structure for the access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Subject type
    #[serde(rename = "type")]
    pub subject_type: SubjectType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issued at timestamp
    pub iat: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// JWT ID (unique identifier for the token)
    pub jti: String,

    pub kind: TokenKind,
}

impl AccessClaims {
    /// Creates new claims for an access token
    ///
    /// # Arguments
    ///
    /// * `subject` - Identity the token asserts
    /// * `now` - Issuance instant
    /// * `ttl` - Validity window
    /// * `issuer` / `audience` - Registered claims checked on decode
    pub fn new(
        subject: &SubjectClaims,
        now: DateTime<Utc>,
        ttl: Duration,
        issuer: &str,
        audience: &str,
    ) -> Self {
        Self {
            sub: subject.subject_id.clone(),
            subject_type: subject.subject_type,
            phone: subject.phone.clone(),
            email: subject.email.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            jti: Uuid::new_v4().to_string(),
            kind: TokenKind::Access,
        }
    }

    /// Checks if the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Checks if the claims are not yet valid at `now`
    pub fn is_premature_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.nbf
    }

    /// Identity carried by the token
    pub fn subject(&self) -> SubjectClaims {
        SubjectClaims {
            subject_id: self.sub.clone(),
            subject_type: self.subject_type,
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }
}

/// Claims structure for the refresh token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,

    #[serde(rename = "type")]
    pub subject_type: SubjectType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Identifier of the stored refresh token record
    #[serde(rename = "tokenId")]
    pub token_id: Uuid,

    /// Family shared by every token rotated from the same login
    #[serde(rename = "tokenFamily")]
    pub family_id: Uuid,

    pub iat: i64,

    pub exp: i64,

    pub iss: String,

    pub aud: String,

    pub kind: TokenKind,
}

impl RefreshClaims {
    /// Creates new claims for a refresh token
    pub fn new(
        subject: &SubjectClaims,
        token_id: Uuid,
        family_id: Uuid,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        issuer: &str,
        audience: &str,
    ) -> Self {
        Self {
            sub: subject.subject_id.clone(),
            subject_type: subject.subject_type,
            phone: subject.phone.clone(),
            email: subject.email.clone(),
            token_id,
            family_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            kind: TokenKind::Refresh,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Identity carried by the token
    pub fn subject(&self) -> SubjectClaims {
        SubjectClaims {
            subject_id: self.sub.clone(),
            subject_type: self.subject_type,
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }
}

/// A freshly minted refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedRefreshToken {
    /// Signed token handed to the client
    pub token: String,
    pub token_id: Uuid,
    pub family_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a successful rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedRefreshToken {
    /// Successor token handed to the client
    pub token: String,
    /// Identity carried over from the presented token
    pub claims: SubjectClaims,
    pub token_id: Uuid,
    pub family_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Always `Bearer`
    pub token_type: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,

    /// Session family the refresh token belongs to
    pub family_id: Uuid,
}

impl TokenPair {
    /// Creates a new token pair
    pub fn new(
        access_token: String,
        refresh_token: String,
        access_expires_in: i64,
        refresh_expires_in: i64,
        family_id: Uuid,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: String::from("Bearer"),
            access_expires_in,
            refresh_expires_in,
            family_id,
        }
    }
}

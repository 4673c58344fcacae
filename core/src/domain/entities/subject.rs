//! Token subjects: who a credential was issued to.

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Longest subject id the shared stores accept
pub const MAX_SUBJECT_ID_LENGTH: usize = 64;

/// Kind of account a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    /// A customer booking beauty services
    Customer,
    /// A salon or freelancer providing services
    Provider,
    /// A marketplace administrator
    Admin,
}

impl SubjectType {
    /// Stable lowercase name, as stored and embedded in tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Customer => "customer",
            SubjectType::Provider => "provider",
            SubjectType::Admin => "admin",
        }
    }
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(SubjectType::Customer),
            "provider" => Ok(SubjectType::Provider),
            "admin" => Ok(SubjectType::Admin),
            other => Err(format!("Unknown subject type: {}", other)),
        }
    }
}

/// Identity claims carried by both access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectClaims {
    /// User identifier
    pub subject_id: String,

    /// Account kind
    pub subject_type: SubjectType,

    /// Phone number, when the login was phone based
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Email address, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SubjectClaims {
    /// Creates claims with only the mandatory identity fields
    pub fn new(subject_id: impl Into<String>, subject_type: SubjectType) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_type,
            phone: None,
            email: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Rejects subject ids the refresh token store cannot hold
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.subject_id.trim().is_empty() {
            return Err(DomainError::Validation {
                message: "Subject id must not be empty".to_string(),
            });
        }
        if self.subject_id.chars().count() > MAX_SUBJECT_ID_LENGTH {
            return Err(DomainError::Validation {
                message: format!(
                    "Subject id exceeds {} characters",
                    MAX_SUBJECT_ID_LENGTH
                ),
            });
        }
        Ok(())
    }
}

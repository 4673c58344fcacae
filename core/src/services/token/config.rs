//! Configuration for the session token services

use bc_shared::config::auth::DEVELOPMENT_SECRET;
use bc_shared::{JwtConfig, RevocationFailMode, SessionConfig};
use chrono::Duration;
use jsonwebtoken::Algorithm;

use crate::domain::entities::{
    ACCESS_TOKEN_EXPIRY_MINUTES, DEFAULT_REVOCATION_HORIZON_DAYS, JWT_AUDIENCE, JWT_ISSUER,
    REFRESH_TOKEN_EXPIRY_DAYS,
};
use crate::errors::DomainError;

/// Configuration for the token codec, revocation registry and rotation manager
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// JWT signing algorithm (HMAC family only)
    pub algorithm: Algorithm,
    /// Access token lifetime in seconds
    pub access_token_expiry_seconds: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry_seconds: i64,
    /// Revocation horizon for access tokens that carry no `exp`
    pub revocation_default_horizon_seconds: i64,
    pub issuer: String,
    pub audience: String,
    /// Refuse weak signing secrets instead of warning about them
    pub enforce_strong_secret: bool,
    /// Registry behaviour on store failure
    pub revocation_fail_mode: RevocationFailMode,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEVELOPMENT_SECRET.to_string(),
            algorithm: Algorithm::HS256,
            access_token_expiry_seconds: ACCESS_TOKEN_EXPIRY_MINUTES * 60,
            refresh_token_expiry_seconds: REFRESH_TOKEN_EXPIRY_DAYS * 24 * 60 * 60,
            revocation_default_horizon_seconds: DEFAULT_REVOCATION_HORIZON_DAYS * 24 * 60 * 60,
            issuer: JWT_ISSUER.to_string(),
            audience: JWT_AUDIENCE.to_string(),
            enforce_strong_secret: false,
            revocation_fail_mode: RevocationFailMode::Open,
        }
    }
}

impl TokenServiceConfig {
    /// Builds the service configuration from the shared configuration types
    ///
    /// # Errors
    ///
    /// `DomainError::Configuration` when the algorithm is not HS256, HS384 or
    /// HS512, or when a lifetime is not positive.
    pub fn from_config(jwt: &JwtConfig, session: &SessionConfig) -> Result<Self, DomainError> {
        let algorithm = match jwt.algorithm.to_uppercase().as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(DomainError::Configuration {
                    message: format!("Unsupported JWT algorithm: {}", other),
                })
            }
        };

        let config = Self {
            jwt_secret: jwt.secret.clone(),
            algorithm,
            access_token_expiry_seconds: jwt.access_token_expiry,
            refresh_token_expiry_seconds: jwt.refresh_token_expiry,
            revocation_default_horizon_seconds: session.revocation_default_horizon,
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            enforce_strong_secret: jwt.enforce_strong_secret,
            revocation_fail_mode: session.revocation_fail_mode,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the lifetimes are usable
    pub fn validate(&self) -> Result<(), DomainError> {
        let lifetimes = [
            ("access token expiry", self.access_token_expiry_seconds),
            ("refresh token expiry", self.refresh_token_expiry_seconds),
            ("revocation horizon", self.revocation_default_horizon_seconds),
        ];
        for (name, seconds) in lifetimes {
            if seconds <= 0 {
                return Err(DomainError::Configuration {
                    message: format!("{} must be positive, got {}", name, seconds),
                });
            }
        }
        Ok(())
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_expiry_seconds)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_expiry_seconds)
    }

    pub fn revocation_default_horizon(&self) -> Duration {
        Duration::seconds(self.revocation_default_horizon_seconds)
    }
}

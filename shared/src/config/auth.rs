//! Token signing and session lifecycle configuration

use serde::{Deserialize, Serialize};

use super::environment::Environment;
use super::{env_or, env_parse};

/// Secret shipped for local development only
pub const DEVELOPMENT_SECRET: &str = "development-only-signing-key-replace-before-deploying";

/// JWT signing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    pub refresh_token_expiry: i64,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,

    /// Algorithm for JWT signing (HS256, HS384 or HS512)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Refuse to start with a weak signing secret
    #[serde(default)]
    pub enforce_strong_secret: bool,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::from(DEVELOPMENT_SECRET),
            access_token_expiry: 900,         // 15 minutes
            refresh_token_expiry: 2_592_000, // 30 days
            issuer: String::from("beautycort"),
            audience: String::from("beautycort-api"),
            algorithm: default_algorithm(),
            enforce_strong_secret: false,
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables
    ///
    /// Strong secrets are enforced in production unless
    /// `JWT_ENFORCE_STRONG_SECRET` says otherwise.
    pub fn from_env(environment: Environment) -> Self {
        let defaults = Self::default();
        Self {
            secret: std::env::var("JWT_SECRET").unwrap_or(defaults.secret),
            access_token_expiry: env_or("JWT_ACCESS_TOKEN_EXPIRY", defaults.access_token_expiry),
            refresh_token_expiry: env_or("JWT_REFRESH_TOKEN_EXPIRY", defaults.refresh_token_expiry),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or(defaults.algorithm),
            enforce_strong_secret: env_parse("JWT_ENFORCE_STRONG_SECRET")
                .unwrap_or_else(|| environment.is_production()),
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86_400;
        self
    }

    /// Check if using the development secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEVELOPMENT_SECRET
    }
}

/// Behaviour of the revocation registry when its store cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RevocationFailMode {
    /// Treat the token as not revoked
    #[default]
    Open,
    /// Treat the token as revoked
    Closed,
}

impl std::str::FromStr for RevocationFailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(RevocationFailMode::Open),
            "closed" => Ok(RevocationFailMode::Closed),
            _ => Err(format!("Invalid revocation fail mode: {}", s)),
        }
    }
}

/// Session lifecycle configuration (revocation registry and cleanup cadence)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Revocation horizon in seconds for access tokens without an `exp` claim
    pub revocation_default_horizon: i64,

    /// Lookup behaviour when the revocation store fails
    #[serde(default)]
    pub revocation_fail_mode: RevocationFailMode,

    /// Revocation registry sweep interval in seconds
    pub revocation_sweep_interval: u64,

    /// Refresh token sweep interval in seconds
    pub refresh_sweep_interval: u64,

    /// Whether background sweeping is enabled
    #[serde(default = "default_cleanup_enabled")]
    pub cleanup_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            revocation_default_horizon: 604_800, // 7 days
            revocation_fail_mode: RevocationFailMode::Open,
            revocation_sweep_interval: 3_600, // 1 hour
            refresh_sweep_interval: 14_400,   // 4 hours
            cleanup_enabled: default_cleanup_enabled(),
        }
    }
}

impl SessionConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            revocation_default_horizon: env_or(
                "REVOCATION_DEFAULT_HORIZON",
                defaults.revocation_default_horizon,
            ),
            revocation_fail_mode: env_or("REVOCATION_FAIL_MODE", defaults.revocation_fail_mode),
            revocation_sweep_interval: env_or(
                "REVOCATION_SWEEP_INTERVAL",
                defaults.revocation_sweep_interval,
            ),
            refresh_sweep_interval: env_or("REFRESH_SWEEP_INTERVAL", defaults.refresh_sweep_interval),
            cleanup_enabled: env_or("TOKEN_CLEANUP_ENABLED", defaults.cleanup_enabled),
        }
    }
}

fn default_algorithm() -> String {
    String::from("HS256")
}

fn default_cleanup_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_config_default() {
        let config = JwtConfig::default();
        assert_eq!(config.access_token_expiry, 900);
        assert_eq!(config.refresh_token_expiry, 2_592_000);
        assert_eq!(config.algorithm, "HS256");
        assert!(config.is_using_default_secret());
        assert!(!config.enforce_strong_secret);
    }

    #[test]
    fn test_jwt_config_builder() {
        let config = JwtConfig::new("my-secret")
            .with_access_expiry_minutes(30)
            .with_refresh_expiry_days(14);

        assert_eq!(config.access_token_expiry, 1800);
        assert_eq!(config.refresh_token_expiry, 1_209_600);
        assert!(!config.is_using_default_secret());
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.revocation_default_horizon, 7 * 86_400);
        assert_eq!(config.revocation_fail_mode, RevocationFailMode::Open);
        assert!(config.cleanup_enabled);
    }

    #[test]
    fn test_fail_mode_from_str() {
        assert_eq!("OPEN".parse::<RevocationFailMode>().unwrap(), RevocationFailMode::Open);
        assert_eq!("closed".parse::<RevocationFailMode>().unwrap(), RevocationFailMode::Closed);
        assert!("ajar".parse::<RevocationFailMode>().is_err());
    }
}

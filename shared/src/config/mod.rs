//! Configuration module with business-specific sub-modules
//!
//! - `auth` - Token signing and session lifecycle configuration
//! - `cache` - Redis configuration for the revocation registry
//! - `database` - Database connection and pool configuration
//! - `environment` - Environment detection and logging configuration
//! - `secret` - Signing secret strength validation

pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;
pub mod secret;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Re-export commonly used types
pub use auth::{JwtConfig, RevocationFailMode, SessionConfig};
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use secret::{validate_secret_strength, SecretStrength};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Token signing configuration
    pub jwt: JwtConfig,

    /// Session lifecycle configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            jwt: JwtConfig::default(),
            session: SessionConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        let mut logging = LoggingConfig::for_environment(environment);
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            logging.level = level;
        }
        if let Some(format) = env_parse::<LogFormat>("LOG_FORMAT") {
            logging.format = format;
        }

        Self {
            environment,
            jwt: JwtConfig::from_env(environment),
            session: SessionConfig::from_env(),
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            logging,
        }
    }
}

/// Read and parse an environment variable, `None` when unset or unparsable
pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

/// Read and parse an environment variable with a fallback
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_parse(key).unwrap_or(default)
}

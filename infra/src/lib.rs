//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer for the BeautyCort session
//! lifecycle, following Clean Architecture principles. It provides the shared
//! stores that let several server instances agree on token state.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL refresh token repository using SQLx, plus migrations
//! - **Cache**: Redis client and the Redis revocation registry store
//! - **Telemetry**: tracing subscriber setup

use bc_core::errors::DomainError;

/// Cache module - Redis client and revocation store
pub mod cache;

/// Database module - MySQL implementations using SQLx
pub mod database;

/// Telemetry module - tracing subscriber initialisation
pub mod telemetry;

pub use cache::{RedisClient, RedisRevocationRepository};
pub use database::{DatabasePool, MySqlRefreshTokenRepository};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Stored payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Config(message) => DomainError::Configuration { message },
            other => DomainError::storage(other.to_string()),
        }
    }
}

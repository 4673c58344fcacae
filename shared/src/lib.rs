//! Shared utilities and common types for the BeautyCort server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types (JWT, session lifecycle, database, cache, logging)
//! - Signing secret strength validation
//! - Error response structures
//! - Language selection for bilingual (English/Arabic) messages

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, DatabaseConfig, Environment, JwtConfig, LogFormat, LoggingConfig,
    RevocationFailMode, SessionConfig,
};
pub use errors::{error_codes, ErrorResponse};
pub use types::Language;

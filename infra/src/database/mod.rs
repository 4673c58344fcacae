//! Database module - MySQL implementations using SQLx
//!
//! This module provides:
//! - Connection pool management
//! - The shared refresh token store used for rotation
//! - Database migrations

pub mod connection;
pub mod mysql;


// Re-export commonly used types
pub use bc_shared::config::database::DatabaseConfig;
pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::MySqlRefreshTokenRepository;

//! Cache module for Redis-backed session state
//!
//! This module provides the Redis client (connection management and retry
//! logic) and the Redis implementation of the revocation registry store.

pub mod redis_client;
pub mod revocation_store;


pub use redis_client::RedisClient;
pub use revocation_store::RedisRevocationRepository;

// Re-export commonly used types
pub use bc_shared::config::cache::CacheConfig;

//! Repository interfaces for session state, with in-memory implementations.

pub mod refresh_token;
pub mod revocation;

pub use refresh_token::{InMemoryRefreshTokenRepository, RefreshTokenRepository};
pub use revocation::{InMemoryRevocationRepository, RevocationRepository};

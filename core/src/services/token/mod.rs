//! Token services for the session lifecycle
//!
//! This module handles:
//! - Signing and verifying access and refresh tokens
//! - The access token revocation registry
//! - Refresh token rotation with replay detection
//! - Session orchestration (login, refresh, authenticate, logout)
//! - Background cleanup of expired state

mod cleanup;
mod codec;
mod config;
mod revocation;
mod rotation;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, TokenCleanupConfig, TokenCleanupService};
pub use codec::TokenCodec;
pub use config::TokenServiceConfig;
pub use revocation::AccessTokenRevocationRegistry;
pub use rotation::RefreshTokenRotationManager;
pub use service::{SessionService, SubjectRevocation};

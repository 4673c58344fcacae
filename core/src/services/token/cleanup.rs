//! Token cleanup service for periodic maintenance of both session stores
//!
//! Each store gets its own sweep cadence. `run_cleanup` can also be driven
//! by an external scheduler when no long-lived process is available.

use bc_shared::SessionConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::errors::DomainError;
use crate::repositories::{RefreshTokenRepository, RevocationRepository};

use super::revocation::AccessTokenRevocationRegistry;
use super::rotation::RefreshTokenRotationManager;

/// Configuration for token cleanup service
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// How often to sweep the revocation registry (in seconds)
    pub revocation_interval_seconds: u64,
    /// How often to sweep refresh tokens (in seconds)
    pub refresh_interval_seconds: u64,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self {
            revocation_interval_seconds: 3600, // Every hour
            refresh_interval_seconds: 14_400,  // Every 4 hours
            enabled: true,
        }
    }
}

impl From<&SessionConfig> for TokenCleanupConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            revocation_interval_seconds: config.revocation_sweep_interval,
            refresh_interval_seconds: config.refresh_sweep_interval,
            enabled: config.cleanup_enabled,
        }
    }
}

/// Service for sweeping expired refresh tokens and revocation entries
pub struct TokenCleanupService<RT, RV>
where
    RT: RefreshTokenRepository + 'static,
    RV: RevocationRepository + 'static,
{
    rotation: Arc<RefreshTokenRotationManager<RT>>,
    registry: Arc<AccessTokenRevocationRegistry<RV>>,
    config: TokenCleanupConfig,
}

impl<RT, RV> TokenCleanupService<RT, RV>
where
    RT: RefreshTokenRepository + 'static,
    RV: RevocationRepository + 'static,
{
    /// Create a new token cleanup service
    pub fn new(
        rotation: Arc<RefreshTokenRotationManager<RT>>,
        registry: Arc<AccessTokenRevocationRegistry<RV>>,
        config: TokenCleanupConfig,
    ) -> Self {
        Self {
            rotation,
            registry,
            config,
        }
    }

    /// Run a single cleanup cycle over both stores
    ///
    /// Failures are collected in the result instead of being returned, so
    /// one failing store does not stop the other from being swept.
    pub async fn run_cleanup(&self) -> CleanupResult {
        let mut result = CleanupResult::default();

        if !self.config.enabled {
            return result;
        }

        info!("Starting token cleanup cycle");

        match self.sweep_revocations().await {
            Ok(count) => result.revocation_entries_deleted = count,
            Err(e) => result.errors.push(format!("Revocation registry cleanup error: {}", e)),
        }

        match self.sweep_refresh_tokens().await {
            Ok(count) => result.refresh_tokens_deleted = count,
            Err(e) => result.errors.push(format!("Refresh token cleanup error: {}", e)),
        }

        info!(
            "Token cleanup completed - Revocation entries: {}, Refresh tokens: {}",
            result.revocation_entries_deleted, result.refresh_tokens_deleted
        );

        result
    }

    /// Sweep the revocation registry once
    pub async fn sweep_revocations(&self) -> Result<usize, DomainError> {
        self.registry.sweep_expired().await.map_err(|e| {
            error!("Failed to sweep revocation registry: {}", e);
            e
        })
    }

    /// Sweep the refresh token store once
    pub async fn sweep_refresh_tokens(&self) -> Result<usize, DomainError> {
        self.rotation.sweep_expired().await.map_err(|e| {
            error!("Failed to sweep refresh tokens: {}", e);
            e
        })
    }

    /// Start one background sweep loop per store
    ///
    /// A failed sweep is logged and retried on the next tick. Dropping the
    /// returned handles leaves the loops running; abort them to stop.
    pub fn start_background_tasks(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Token cleanup service is disabled");
            return Vec::new();
        }

        let revocation_service = Arc::clone(&self);
        let revocation_every = self.config.revocation_interval_seconds;
        let revocation_task = tokio::spawn(async move {
            info!(
                "Revocation registry cleanup started - will run every {} seconds",
                revocation_every
            );
            let mut timer = tokio::time::interval(std::time::Duration::from_secs(revocation_every.max(1)));
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                // Errors are already logged by the sweep itself
                let _ = revocation_service.sweep_revocations().await;
            }
        });

        let refresh_service = self;
        let refresh_every = refresh_service.config.refresh_interval_seconds;
        let refresh_task = tokio::spawn(async move {
            info!(
                "Refresh token cleanup started - will run every {} seconds",
                refresh_every
            );
            let mut timer = tokio::time::interval(std::time::Duration::from_secs(refresh_every.max(1)));
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                let _ = refresh_service.sweep_refresh_tokens().await;
            }
        });

        vec![revocation_task, refresh_task]
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of expired revocation entries deleted
    pub revocation_entries_deleted: usize,
    /// Number of expired refresh tokens deleted
    pub refresh_tokens_deleted: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get total number of items cleaned up
    pub fn total_cleaned(&self) -> usize {
        self.revocation_entries_deleted + self.refresh_tokens_deleted
    }
}

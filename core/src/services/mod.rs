//! Business services containing the session lifecycle logic.

pub mod clock;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use token::{
    AccessTokenRevocationRegistry, CleanupResult, RefreshTokenRotationManager, SessionService,
    SubjectRevocation, TokenCleanupConfig, TokenCleanupService, TokenCodec, TokenServiceConfig,
};

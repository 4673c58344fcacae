//! # BeautyCort Core
//!
//! Session and credential lifecycle for the BeautyCort backend: the access
//! token revocation registry, refresh token rotation with replay detection,
//! and the session service composing them. Storage is abstracted behind
//! repository traits; in-memory implementations are included.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;

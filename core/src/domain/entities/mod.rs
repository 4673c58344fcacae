//! Domain entities representing core business objects.

pub mod refresh_token;
pub mod revocation;
pub mod subject;
pub mod token;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use refresh_token::RefreshTokenRecord;
pub use revocation::{RevocationEntry, RevocationReason};
pub use subject::{SubjectClaims, SubjectType, MAX_SUBJECT_ID_LENGTH};
pub use token::{
    AccessClaims, IssuedRefreshToken, RefreshClaims, RotatedRefreshToken, TokenKind, TokenPair,
    ACCESS_TOKEN_EXPIRY_MINUTES, DEFAULT_REVOCATION_HORIZON_DAYS, JWT_AUDIENCE, JWT_ISSUER,
    REFRESH_TOKEN_EXPIRY_DAYS,
};

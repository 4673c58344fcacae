//! Token lifecycle error types
//!
//! Display strings are bilingual (`English | Arabic`); callers pick the half
//! matching the client language with [`bc_shared::Language::select`].

use bc_shared::{error_codes, ErrorResponse};
use thiserror::Error;

/// Token-related errors
///
/// `InvalidToken`, `TokenNotFound`, `TokenExpired` and `TokenReplayDetected`
/// are business outcomes that require the client to log in again. They are
/// never retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed token, bad signature, wrong algorithm or wrong token kind
    #[error("Invalid token | رمز غير صالح")]
    InvalidToken,

    /// Refresh token id unknown to the store
    #[error("Token not found | الرمز غير موجود")]
    TokenNotFound,

    #[error("Token expired | انتهت صلاحية الرمز")]
    TokenExpired,

    /// An already used refresh token was presented again
    #[error("Token reuse detected, please sign in again | تم اكتشاف إعادة استخدام الرمز، يرجى تسجيل الدخول مجددا")]
    TokenReplayDetected,

    /// Access token found in the revocation registry
    #[error("Token revoked | تم إلغاء الرمز")]
    TokenRevoked,

    /// Backing store unreachable or failing; the detail is for logs only
    #[error("Storage unavailable | التخزين غير متاح")]
    StorageFailure { message: String },

    #[error("Token revocation failed | فشل إلغاء الرمز")]
    RevocationFailed,

    #[error("Token generation failed | فشل إنشاء الرمز")]
    TokenGenerationFailed,

    #[error("Signing secret is too weak | مفتاح التوقيع ضعيف جدا")]
    WeakSigningSecret,
}

impl TokenError {
    /// Stable machine readable code
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidToken => error_codes::INVALID_TOKEN,
            TokenError::TokenNotFound => error_codes::TOKEN_NOT_FOUND,
            TokenError::TokenExpired => error_codes::TOKEN_EXPIRED,
            TokenError::TokenReplayDetected => error_codes::TOKEN_REPLAY_DETECTED,
            TokenError::TokenRevoked => error_codes::TOKEN_REVOKED,
            TokenError::StorageFailure { .. } => error_codes::STORAGE_FAILURE,
            TokenError::RevocationFailed => error_codes::REVOCATION_FAILED,
            TokenError::TokenGenerationFailed => error_codes::TOKEN_GENERATION_FAILED,
            TokenError::WeakSigningSecret => error_codes::WEAK_SIGNING_SECRET,
        }
    }

    /// Whether the client must perform a fresh login
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            TokenError::InvalidToken
                | TokenError::TokenNotFound
                | TokenError::TokenExpired
                | TokenError::TokenReplayDetected
                | TokenError::TokenRevoked
        )
    }
}

impl From<TokenError> for ErrorResponse {
    fn from(err: TokenError) -> Self {
        let response = ErrorResponse::new(err.code(), err.to_string());
        match err {
            TokenError::TokenReplayDetected => response.add_detail("action", "reauthenticate"),
            _ => response,
        }
    }
}

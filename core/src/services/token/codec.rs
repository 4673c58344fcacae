//! Signed token codec (HMAC JWT) and token fingerprinting

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use bc_shared::config::{validate_secret_strength, SecretStrength};

use crate::errors::{DomainError, TokenError};

use super::config::TokenServiceConfig;

/// Length of the fingerprint prefix written to logs
const LOG_FINGERPRINT_LEN: usize = 12;

/// Only the expiry is read when peeking at an unverified token
#[derive(Debug, Deserialize)]
struct ExpiryPeek {
    #[serde(default)]
    exp: Option<i64>,
}

/// Encodes and verifies signed tokens
///
/// Expiry is not checked here. Callers compare `exp` against the injected
/// clock instead of the system time.
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Creates a codec, checking the signing secret first
    ///
    /// # Arguments
    ///
    /// * `config` - Token service configuration
    ///
    /// # Returns
    ///
    /// * `Ok(TokenCodec)` - Ready to sign and verify
    /// * `Err(DomainError::Token(TokenError::WeakSigningSecret))` - Weak secret with enforcement on
    pub fn new(config: &TokenServiceConfig) -> Result<Self, DomainError> {
        match validate_secret_strength(&config.jwt_secret) {
            SecretStrength::Weak if config.enforce_strong_secret => {
                error!("Refusing to sign tokens with a weak JWT secret");
                return Err(TokenError::WeakSigningSecret.into());
            }
            SecretStrength::Weak => {
                warn!("JWT secret is weak; set a random secret of at least 64 characters before deploying");
            }
            SecretStrength::Acceptable => {
                debug!("JWT secret is acceptable but shorter or less random than recommended");
            }
            SecretStrength::Strong => {}
        }

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Ok(Self {
            algorithm: config.algorithm,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        })
    }

    /// Signs `claims`
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, DomainError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign token: {}", e);
            DomainError::Token(TokenError::TokenGenerationFailed)
        })
    }

    /// Verifies signature, algorithm, issuer and audience, then deserializes the payload
    ///
    /// Any failure, including a payload of the wrong shape, is `InvalidToken`.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {:?}", e.kind());
                TokenError::InvalidToken
            })
    }

    /// Reads `exp` without verifying the signature
    ///
    /// # Returns
    ///
    /// * `Ok(Some(exp))` - Expiry as a unix timestamp
    /// * `Ok(None)` - Well formed token without an `exp` claim
    /// * `Err(TokenError::InvalidToken)` - Not a decodable JWT
    pub fn peek_expiry(&self, token: &str) -> Result<Option<i64>, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<ExpiryPeek>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims.exp)
            .map_err(|e| {
                debug!("Unable to read token expiry: {:?}", e.kind());
                TokenError::InvalidToken
            })
    }

    /// SHA-256 hex digest of a raw token
    pub fn fingerprint(raw_token: &str) -> String {
        hex::encode(Sha256::digest(raw_token.as_bytes()))
    }
}

/// Fingerprint prefix safe to write to logs
pub(crate) fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..LOG_FINGERPRINT_LEN).unwrap_or(fingerprint)
}

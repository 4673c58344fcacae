//! Signing secret strength validation
//!
//! HMAC secrets shorter than 256 bits, low in entropy, or built around
//! guessable words are rejected before any token is signed with them.

use serde::{Deserialize, Serialize};

/// Minimum secret length in bytes (256 bits)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Recommended secret length in bytes (512 bits)
pub const RECOMMENDED_SECRET_LENGTH: usize = 64;

/// Substrings that mark a secret as guessable
const WEAK_PATTERNS: &[&str] = &[
    "secret",
    "password",
    "jwt",
    "token",
    "123456",
    "admin",
    "beautycort",
    "test",
    "changeme",
    "default",
];

/// Secret strength classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretStrength {
    /// Must be rejected
    Weak,
    /// Usable, but shorter or less random than recommended
    Acceptable,
    /// Meets the recommended length and entropy
    Strong,
}

/// Classify a signing secret
pub fn validate_secret_strength(secret: &str) -> SecretStrength {
    let bytes = secret.as_bytes();

    if bytes.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let lowered = secret.to_lowercase();
    if WEAK_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
        return SecretStrength::Weak;
    }

    if bytes.iter().all(|b| *b == bytes[0]) {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(bytes);
    if entropy < 4.0 {
        return SecretStrength::Weak;
    }

    if bytes.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Shannon entropy in bits per byte (0-8)
fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut freq = [0u32; 256];
    for &b in data {
        freq[b as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

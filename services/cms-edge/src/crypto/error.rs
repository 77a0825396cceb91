//! Field-encryption error types.

use thiserror::Error;

/// Errors from the field encryptor and payload envelope.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Secret is empty or otherwise unusable as key material
    #[error("Invalid encryption key")]
    InvalidKey,

    /// Blob carries the tag but its body is malformed
    #[error("invalid ciphertext: {reason}")]
    InvalidCiphertext {
        /// What was wrong with the blob
        reason: &'static str,
    },

    /// GCM tag did not verify (wrong key or tampered blob)
    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Sealing failed
    #[error("Encryption failed: {reason}")]
    EncryptionFailed {
        /// Reason for failure (sanitized)
        reason: String,
    },

    /// Encrypted payload map is missing fields or decrypts to a non-object
    #[error("Invalid encrypted payload: {reason}")]
    InvalidPayload {
        /// What was wrong with the payload
        reason: String,
    },

    /// JSON encoding of a payload failed
    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid crypto configuration: {reason}")]
    InvalidConfig {
        /// Reason for invalid configuration
        reason: String,
    },
}

impl CryptoError {
    /// Creates an EncryptionFailed error
    #[must_use]
    pub fn encryption_failed(reason: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            reason: sanitize_error_message(&reason.into()),
        }
    }

    /// Creates an InvalidPayload error
    #[must_use]
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: sanitize_error_message(&reason.into()),
        }
    }

    /// Creates an InvalidConfig error
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid_key",
            Self::InvalidCiphertext { .. } => "invalid_ciphertext",
            Self::DecryptionFailed => "decryption_failed",
            Self::EncryptionFailed { .. } => "encryption_failed",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::Serialization(_) => "serialization",
            Self::InvalidConfig { .. } => "invalid_config",
        }
    }
}

/// Sensitive patterns that should be sanitized from error messages
const SENSITIVE_PATTERNS: &[&str] = &[
    "key",
    "secret",
    "password",
    "token",
    "credential",
    "private",
    "nonce",
];

const REDACTED: &str = "Operation failed (details redacted)";

/// Sanitizes error messages to remove potential key material
fn sanitize_error_message(message: &str) -> String {
    let lower = message.to_lowercase();

    if looks_like_key_material(&lower) {
        return REDACTED.to_string();
    }

    if lower.contains('=') && SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return REDACTED.to_string();
    }

    message.to_string()
}

/// Long hex or base64 runs are treated as possible key material.
#[allow(clippy::cast_precision_loss)]
fn looks_like_key_material(s: &str) -> bool {
    let hex_chars = s.chars().filter(char::is_ascii_hexdigit).count();
    if hex_chars >= 32 {
        let total_alnum = s.chars().filter(|c| c.is_alphanumeric()).count();
        if total_alnum > 0 && (hex_chars as f64 / total_alnum as f64) > 0.8 {
            return true;
        }
    }

    let base64_chars = s
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '+' | '/' | '='))
        .count();
    base64_chars >= 44 && !s.is_empty() && (base64_chars as f64 / s.len() as f64) > 0.9
}

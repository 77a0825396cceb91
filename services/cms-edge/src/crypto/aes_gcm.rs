//! AES-256-GCM field encryptor with the `enc:` blob format.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::crypto::error::CryptoError;

/// Tag marking an encrypted blob.
pub const ENCRYPTED_PREFIX: &str = "enc:";

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Whether `value` carries the encrypted-blob tag.
#[must_use]
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Symmetric encryptor keyed by SHA-256 of a secret.
///
/// Immutable after construction, safe to share across tasks.
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").field("key", &"[REDACTED]").finish()
    }
}

impl Encryptor {
    /// Derive the key from `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] for an empty secret.
    pub fn new(secret: &str) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::InvalidKey);
        }
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Seal `plaintext` into `enc:` + base64(nonce ‖ ciphertext ‖ tag).
    ///
    /// Empty input yields empty output.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if sealing fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::encryption_failed("AEAD seal failed"))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&sealed);

        Ok(format!("{ENCRYPTED_PREFIX}{}", STANDARD.encode(blob)))
    }

    /// Open a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Untagged input is legacy plaintext and comes back unchanged.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::InvalidCiphertext`] for bad base64 or a body shorter
    ///   than the nonce
    /// - [`CryptoError::DecryptionFailed`] when the tag does not verify
    pub fn decrypt(&self, value: &str) -> Result<String, CryptoError> {
        let Some(encoded) = value.strip_prefix(ENCRYPTED_PREFIX) else {
            return Ok(value.to_string());
        };

        let blob = STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::InvalidCiphertext {
                reason: "invalid base64 encoding",
            })?;
        if blob.len() < NONCE_LEN {
            return Err(CryptoError::InvalidCiphertext {
                reason: "ciphertext too short",
            });
        }

        let (nonce, sealed) = blob.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plain).map_err(|_| CryptoError::InvalidCiphertext {
            reason: "plaintext is not valid UTF-8",
        })
    }
}

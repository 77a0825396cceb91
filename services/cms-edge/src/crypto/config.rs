//! Field-encryption configuration.

use secrecy::{ExposeSecret, SecretString};

use crate::crypto::error::CryptoError;

/// Whether field encryption is on, and the secret it derives its key from.
#[derive(Debug, Clone, Default)]
pub struct EncryptionConfig {
    /// Turn encryption on
    pub enabled: bool,
    /// Process-wide secret; the AES key is its SHA-256
    pub key: Option<SecretString>,
}

impl EncryptionConfig {
    /// Creates a new config with encryption enabled/disabled
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Creates a new config with the given secret
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(SecretString::from(key.into()));
        self
    }

    /// Secret text, when encryption is enabled and a non-empty key is set.
    #[must_use]
    pub fn active_key(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.key
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|k| !k.is_empty())
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidConfig` if encryption is enabled without
    /// a non-empty key.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.enabled && self.active_key().is_none() {
            return Err(CryptoError::invalid_config(
                "encryption is enabled but no key is configured",
            ));
        }
        Ok(())
    }
}

//! Shared encryptor handle with a disabled no-op mode.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::crypto::aes_gcm::Encryptor;
use crate::crypto::config::EncryptionConfig;
use crate::crypto::error::CryptoError;
use crate::crypto::logging::{log_crypto_error, log_crypto_operation, log_encryption_state};
use crate::observability::EdgeMetrics;

/// Cloneable handle to the process encryptor.
///
/// A disabled handle returns every input unchanged. Pass the handle to the
/// components that need it; [`global`] exists for call sites that cannot
/// take it as a dependency.
#[derive(Debug, Clone, Default)]
pub struct CryptoHandle {
    encryptor: Option<Arc<Encryptor>>,
    metrics: Option<EdgeMetrics>,
}

impl CryptoHandle {
    /// Handle backed by `encryptor`.
    #[must_use]
    pub fn new(encryptor: Encryptor) -> Self {
        Self {
            encryptor: Some(Arc::new(encryptor)),
            metrics: None,
        }
    }

    /// No-op handle.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build from configuration, logging whether encryption is on.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidConfig`] when encryption is enabled
    /// without a key.
    pub fn from_config(config: &EncryptionConfig) -> Result<Self, CryptoError> {
        config.validate()?;
        let handle = match config.active_key() {
            Some(key) => Self::new(Encryptor::new(key)?),
            None => Self::disabled(),
        };
        log_encryption_state(handle.is_enabled());
        Ok(handle)
    }

    /// Record operation counts on `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: EdgeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether an encryptor is installed.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.encryptor.is_some()
    }

    /// Encrypt, or return `plaintext` unchanged when disabled.
    ///
    /// # Errors
    ///
    /// Propagates [`Encryptor::encrypt`] errors.
    pub fn encrypt_if_needed(&self, plaintext: &str) -> Result<String, CryptoError> {
        match &self.encryptor {
            Some(enc) => self.observe("encrypt", || enc.encrypt(plaintext)),
            None => Ok(plaintext.to_string()),
        }
    }

    /// Decrypt, or return `value` unchanged when disabled.
    ///
    /// # Errors
    ///
    /// Propagates [`Encryptor::decrypt`] errors.
    pub fn decrypt_if_needed(&self, value: &str) -> Result<String, CryptoError> {
        match &self.encryptor {
            Some(enc) => self.observe("decrypt", || enc.decrypt(value)),
            None => Ok(value.to_string()),
        }
    }

    fn observe(
        &self,
        operation: &str,
        f: impl FnOnce() -> Result<String, CryptoError>,
    ) -> Result<String, CryptoError> {
        let start = Instant::now();
        let result = f();
        match &result {
            Ok(_) => log_crypto_operation(operation, start.elapsed()),
            Err(e) => log_crypto_error(operation, e),
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_crypto(operation, result.is_ok());
        }
        result
    }
}

static GLOBAL: OnceLock<CryptoHandle> = OnceLock::new();

/// Install the process-wide handle. Only the first call takes effect; later
/// calls return the handle already installed.
///
/// # Errors
///
/// Returns configuration errors from [`CryptoHandle::from_config`] when
/// nothing is installed yet.
pub fn init_global(config: &EncryptionConfig) -> Result<CryptoHandle, CryptoError> {
    if let Some(handle) = GLOBAL.get() {
        return Ok(handle.clone());
    }
    let handle = CryptoHandle::from_config(config)?;
    Ok(GLOBAL.get_or_init(|| handle).clone())
}

/// The process-wide handle, or a disabled one before [`init_global`].
#[must_use]
pub fn global() -> CryptoHandle {
    GLOBAL.get().cloned().unwrap_or_default()
}

//! Structured logging helpers for crypto operations.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::crypto::error::CryptoError;

/// Log a successful crypto operation.
pub fn log_crypto_operation(operation: &str, duration: Duration) {
    info!(
        target: "crypto",
        operation = %operation,
        duration = ?duration,
        status = "success",
        "Crypto operation completed"
    );
}

/// Log a crypto error. Messages are already sanitized by [`CryptoError`].
pub fn log_crypto_error(operation: &str, error: &CryptoError) {
    error!(
        target: "crypto",
        operation = %operation,
        error_type = %error.kind(),
        error_message = %error,
        status = "error",
        "Crypto operation failed"
    );
}

/// Log whether field encryption is active, once at initialization.
pub fn log_encryption_state(enabled: bool) {
    if enabled {
        info!(target: "crypto", enabled, "Field encryption enabled");
    } else {
        warn!(
            target: "crypto",
            enabled,
            "Field encryption DISABLED, payloads are stored in plaintext"
        );
    }
}

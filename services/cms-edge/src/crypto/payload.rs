//! Encrypted task-payload envelope.
//!
//! The whole map is sealed into `_encrypted_config`; `task_id` and
//! `task_type` stay in clear so schedulers can route without the key.

use serde_json::{Map, Value};

use crate::crypto::aes_gcm::ENCRYPTED_PREFIX;
use crate::crypto::error::CryptoError;
use crate::crypto::handle::CryptoHandle;

/// Flag key marking an encrypted payload.
pub const IS_ENCRYPTED_KEY: &str = "_is_encrypted";
/// Key holding the sealed payload.
pub const ENCRYPTED_CONFIG_KEY: &str = "_encrypted_config";
/// Routing keys copied out in clear.
pub const ROUTING_KEYS: [&str; 2] = ["task_id", "task_type"];

/// Whether `payload` carries `_is_encrypted: true`.
#[must_use]
pub fn has_encrypted_payload(payload: &Map<String, Value>) -> bool {
    payload.get(IS_ENCRYPTED_KEY).and_then(Value::as_bool) == Some(true)
}

impl CryptoHandle {
    /// Seal `payload` into the envelope form.
    ///
    /// When the handle is disabled the JSON text is stored as is, so the
    /// envelope shape does not depend on configuration.
    ///
    /// # Errors
    ///
    /// Returns serialization or encryption errors.
    pub fn encrypt_payload(&self, payload: &Map<String, Value>) -> Result<Map<String, Value>, CryptoError> {
        let json = serde_json::to_string(payload)?;
        let sealed = self.encrypt_if_needed(&json)?;

        let mut envelope = Map::new();
        envelope.insert(ENCRYPTED_CONFIG_KEY.to_string(), Value::String(sealed));
        envelope.insert(IS_ENCRYPTED_KEY.to_string(), Value::Bool(true));
        for key in ROUTING_KEYS {
            if let Some(value) = payload.get(key) {
                envelope.insert(key.to_string(), value.clone());
            }
        }
        Ok(envelope)
    }

    /// Open an envelope produced by [`encrypt_payload`](Self::encrypt_payload).
    ///
    /// Maps without `_is_encrypted: true` are returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::InvalidPayload`] when `_encrypted_config` is missing,
    ///   not a string, or does not decrypt to a JSON object
    /// - decryption errors from the handle
    pub fn decrypt_payload(&self, payload: Map<String, Value>) -> Result<Map<String, Value>, CryptoError> {
        if !has_encrypted_payload(&payload) {
            return Ok(payload);
        }

        let sealed = match payload.get(ENCRYPTED_CONFIG_KEY) {
            Some(Value::String(s)) => s,
            Some(_) => return Err(CryptoError::invalid_payload("_encrypted_config is not a string")),
            None => return Err(CryptoError::invalid_payload("_encrypted_config is missing")),
        };

        if sealed.starts_with(ENCRYPTED_PREFIX) && !self.is_enabled() {
            return Err(CryptoError::invalid_config(
                "payload is encrypted but encryption is disabled",
            ));
        }

        let json = self.decrypt_if_needed(sealed)?;
        match serde_json::from_str::<Value>(&json) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CryptoError::invalid_payload("decrypted payload is not an object")),
            Err(_) => Err(CryptoError::invalid_payload("decrypted payload is not valid JSON")),
        }
    }
}

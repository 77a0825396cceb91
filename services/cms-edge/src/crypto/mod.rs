//! Field-level envelope encryption.
//!
//! AES-256-GCM blobs tagged with `enc:`, a payload envelope for task
//! configuration, and a handle that degrades to a passthrough when
//! encryption is disabled.

pub mod aes_gcm;
pub mod config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod payload;

pub use aes_gcm::{ENCRYPTED_PREFIX, Encryptor, is_encrypted};
pub use config::EncryptionConfig;
pub use error::CryptoError;
pub use handle::{CryptoHandle, global, init_global};
pub use payload::{ENCRYPTED_CONFIG_KEY, IS_ENCRYPTED_KEY, has_encrypted_payload};

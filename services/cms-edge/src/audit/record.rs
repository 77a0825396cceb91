//! Record hashing and signing.
//!
//! `log_hash` is the lowercase hex SHA-256 of the protobuf encoding of the
//! record with `log_hash` and `signature` cleared. The signature covers a
//! canonical JSON document (keys sorted) binding the hash to the tenant,
//! user and creation time. Verifiers recompute both the same way.

use prost::Message;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::signer::{AuditSigner, SignerError, verify};
use crate::proto::{ApiAuditLog, LoginAuditLog};

/// Fields covered by a record signature.
///
/// Declared in key order, so serde_json emits canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignContent {
    /// Record hash
    pub log_hash: String,
    /// `created_at` nanoseconds
    pub nanos: i32,
    /// `created_at` seconds
    pub sec: i64,
    /// Tenant id, 0 when absent
    pub tenant_id: u32,
    /// User id, 0 when absent
    pub user_id: u32,
    /// Username, login records only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl SignContent {
    /// Canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Propagates serialization errors.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// A record that can be hashed and signed.
pub trait AuditRecord: Message + Clone {
    /// Record kind used in logs and metrics
    const KIND: &'static str;

    /// Current hash.
    fn seal_hash(&self) -> Option<&str>;

    /// Current signature.
    fn seal_signature(&self) -> Option<&[u8]>;

    /// Replace hash and signature.
    fn set_seal(&mut self, log_hash: Option<String>, signature: Option<Vec<u8>>);

    /// Signed fields.
    fn sign_content(&self) -> SignContent;
}

fn timestamp_parts(ts: Option<&prost_types::Timestamp>) -> (i64, i32) {
    ts.map_or((0, 0), |t| (t.seconds, t.nanos))
}

impl AuditRecord for ApiAuditLog {
    const KIND: &'static str = "api";

    fn seal_hash(&self) -> Option<&str> {
        self.log_hash.as_deref()
    }

    fn seal_signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    fn set_seal(&mut self, log_hash: Option<String>, signature: Option<Vec<u8>>) {
        self.log_hash = log_hash;
        self.signature = signature;
    }

    fn sign_content(&self) -> SignContent {
        let (sec, nanos) = timestamp_parts(self.created_at.as_ref());
        SignContent {
            log_hash: self.log_hash.clone().unwrap_or_default(),
            nanos,
            sec,
            tenant_id: self.tenant_id(),
            user_id: self.user_id(),
            username: None,
        }
    }
}

impl AuditRecord for LoginAuditLog {
    const KIND: &'static str = "login";

    fn seal_hash(&self) -> Option<&str> {
        self.log_hash.as_deref()
    }

    fn seal_signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    fn set_seal(&mut self, log_hash: Option<String>, signature: Option<Vec<u8>>) {
        self.log_hash = log_hash;
        self.signature = signature;
    }

    fn sign_content(&self) -> SignContent {
        let (sec, nanos) = timestamp_parts(self.created_at.as_ref());
        SignContent {
            log_hash: self.log_hash.clone().unwrap_or_default(),
            nanos,
            sec,
            tenant_id: self.tenant_id(),
            user_id: self.user_id(),
            username: Some(self.username.clone()),
        }
    }
}

/// Hash of `record` ignoring its current hash and signature.
#[must_use]
pub fn compute_hash<R: AuditRecord>(record: &R) -> String {
    let mut unsealed = record.clone();
    unsealed.set_seal(None, None);
    hex::encode(Sha256::digest(unsealed.encode_to_vec()))
}

/// Set `log_hash`, then sign. Without a signer the signature stays empty.
///
/// # Errors
///
/// Returns an error if signing fails; the hash is set regardless.
pub fn seal<R: AuditRecord>(record: &mut R, signer: Option<&AuditSigner>) -> Result<(), SignerError> {
    let hash = compute_hash(record);
    record.set_seal(Some(hash), None);

    let Some(signer) = signer else {
        return Ok(());
    };
    let content = record.sign_content().to_bytes()?;
    let signature = signer.sign(&content)?;
    let hash = record.seal_hash().map(str::to_string);
    record.set_seal(hash, Some(signature));
    Ok(())
}

/// Recompute the hash and check the signature against `public_key`.
#[must_use]
pub fn verify_record<R: AuditRecord>(record: &R, public_key: &[u8]) -> bool {
    let Some(hash) = record.seal_hash() else {
        return false;
    };
    if compute_hash(record) != hash {
        return false;
    }
    let (Some(signature), Ok(content)) = (record.seal_signature(), record.sign_content().to_bytes()) else {
        return false;
    };
    verify(public_key, &content, signature)
}

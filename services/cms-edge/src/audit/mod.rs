//! Tamper-evident audit logging.
//!
//! Per-request api records and per-login records, hashed over their binary
//! encoding, signed with ECDSA P-256 and emitted to a sink after the
//! response is produced.

pub mod builder;
pub mod device;
pub mod geo;
pub mod layer;
pub mod options;
pub mod record;
pub mod request;
pub mod risk;
pub mod signer;
pub mod sink;

pub use builder::{Auditor, RequestFacts};
pub use geo::{GeoResolver, NoopGeoResolver, SharedGeoResolver};
pub use layer::{AuditLayer, AuditService};
pub use options::AuditOptions;
pub use record::{AuditRecord, compute_hash, seal, verify_record};
pub use request::Outcome;
pub use signer::{AuditSigner, SignerError};
pub use sink::{AuditSink, DEFAULT_QUEUE_CAPACITY, LogAuditSink, QueuedAuditSink, SharedAuditSink};

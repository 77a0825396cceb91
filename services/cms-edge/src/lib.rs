//! CMS Edge - the request-handling edge shared by the CMS gateways.
//!
//! This crate provides the pipeline every inbound call traverses before it
//! reaches business code: bearer-token checking and operator identity,
//! identity propagation over gRPC, HTTP and broker carriers, tamper-evident
//! audit records, and field-level envelope encryption.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod auth;
pub mod broker;
pub mod config;
pub mod crypto;
pub mod error;
pub mod observability;
pub mod operator;
pub mod proto;
pub mod token;
pub mod transport;
pub mod viewer;

pub use audit::{AuditLayer, AuditOptions, Auditor};
pub use auth::{AuthLayer, AuthOptions};
pub use config::{Config, ConfigError};
pub use crypto::{CryptoError, CryptoHandle, EncryptionConfig};
pub use error::{EdgeError, ErrorCode, ErrorResponse};
pub use transport::{RemoteAddr, RouteInfo, TransportKind};
pub use viewer::{UserViewer, Viewer};

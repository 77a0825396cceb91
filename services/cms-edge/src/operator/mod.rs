//! Operator identity envelope.
//!
//! An [`OperatorMetadata`] is protobuf-encoded and base64url'd (no padding)
//! into a single header value, `x-md-operator`, carried on gRPC metadata and
//! HTTP headers. The identity for the current request is also available as
//! a task-local so outbound clients can stamp it without plumbing.

pub mod error;
pub mod grpc;
pub mod http;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use prost::Message;
use std::future::Future;

pub use error::MetadataError;
pub use grpc::OperatorInterceptor;

use crate::proto::{DataScope, OperatorKind, OperatorMetadata};

/// Header carrying the envelope.
pub const OPERATOR_HEADER: &str = "x-md-operator";

/// Standard alphabet, padded or not.
const STANDARD_ANY_PAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

tokio::task_local! {
    static CURRENT_OPERATOR: OperatorMetadata;
}

/// System task operating on `tenant_id`, with full data scope.
#[must_use]
pub fn system_operator(tenant_id: u64) -> OperatorMetadata {
    OperatorMetadata {
        kind: OperatorKind::System as i32,
        tenant_id,
        data_scope: DataScope::All as i32,
        ..Default::default()
    }
}

/// Service identity with full data scope.
#[must_use]
pub fn service_operator(user_id: u64, tenant_id: u64) -> OperatorMetadata {
    OperatorMetadata {
        kind: OperatorKind::Service as i32,
        user_id,
        tenant_id,
        data_scope: DataScope::All as i32,
        ..Default::default()
    }
}

/// Human user, the normal case.
#[must_use]
pub fn user_operator(
    user_id: u64,
    tenant_id: u64,
    org_unit_id: u64,
    data_scope: DataScope,
) -> OperatorMetadata {
    OperatorMetadata {
        kind: OperatorKind::User as i32,
        user_id,
        tenant_id,
        org_unit_id,
        data_scope: data_scope as i32,
        ..Default::default()
    }
}

/// Encode an identity to its header value.
#[must_use]
pub fn encode(operator: &OperatorMetadata) -> String {
    URL_SAFE_NO_PAD.encode(operator.encode_to_vec())
}

/// Decode a header value. Standard base64, with or without padding, is
/// accepted as well.
///
/// # Errors
///
/// - [`MetadataError::EmptyOperatorString`] for `""`
/// - [`MetadataError::InvalidOperator`] when base64 or protobuf decoding fails
pub fn decode(value: &str) -> Result<OperatorMetadata, MetadataError> {
    if value.is_empty() {
        return Err(MetadataError::EmptyOperatorString);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .or_else(|_| STANDARD_ANY_PAD.decode(value))
        .map_err(|_| MetadataError::InvalidOperator {
            reason: "invalid base64",
        })?;
    OperatorMetadata::decode(bytes.as_slice()).map_err(|_| MetadataError::InvalidOperator {
        reason: "invalid protobuf",
    })
}

/// Run `fut` with `operator` as the current identity.
pub async fn scope<F: Future>(operator: OperatorMetadata, fut: F) -> F::Output {
    CURRENT_OPERATOR.scope(operator, fut).await
}

/// Identity installed by [`scope`], if any.
#[must_use]
pub fn current() -> Option<OperatorMetadata> {
    CURRENT_OPERATOR.try_with(Clone::clone).ok()
}

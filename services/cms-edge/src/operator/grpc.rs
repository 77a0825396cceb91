//! Envelope on gRPC metadata.

use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::service::Interceptor;
use tonic::{Request, Status};

use super::{MetadataError, OPERATOR_HEADER, decode, encode};
use crate::proto::OperatorMetadata;

/// Read the envelope from metadata.
///
/// # Errors
///
/// - [`MetadataError::NoMetadata`] when the map is empty
/// - [`MetadataError::NoOperatorHeader`] when the header is absent or empty
/// - decode errors from [`decode`]
pub fn from_metadata(metadata: &MetadataMap) -> Result<OperatorMetadata, MetadataError> {
    if metadata.is_empty() {
        return Err(MetadataError::NoMetadata);
    }
    let value = metadata
        .get(OPERATOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(MetadataError::NoOperatorHeader)?;
    decode(value)
}

/// Write the envelope into metadata, replacing any previous value.
///
/// # Errors
///
/// Returns [`MetadataError::InvalidOperator`] if the encoded value is not
/// valid metadata.
pub fn inject_metadata(
    metadata: &mut MetadataMap,
    operator: &OperatorMetadata,
) -> Result<(), MetadataError> {
    let value = AsciiMetadataValue::try_from(encode(operator)).map_err(|_| {
        MetadataError::InvalidOperator {
            reason: "envelope is not valid metadata",
        }
    })?;
    metadata.insert(OPERATOR_HEADER, value);
    Ok(())
}

/// Operator of an inbound request.
///
/// # Errors
///
/// See [`from_metadata`].
pub fn from_request<T>(request: &Request<T>) -> Result<OperatorMetadata, MetadataError> {
    from_metadata(request.metadata())
}

/// Stamp an outbound request.
///
/// # Errors
///
/// See [`inject_metadata`].
pub fn attach<T>(request: &mut Request<T>, operator: &OperatorMetadata) -> Result<(), MetadataError> {
    inject_metadata(request.metadata_mut(), operator)
}

/// Client interceptor stamping `x-md-operator` on every call.
///
/// Uses a fixed identity when one is given, otherwise the identity of the
/// request being served (see [`super::scope`]). Calls made outside any
/// request go out unstamped.
#[derive(Debug, Clone, Default)]
pub struct OperatorInterceptor {
    fixed: Option<OperatorMetadata>,
}

impl OperatorInterceptor {
    /// Forward the identity of the current request.
    #[must_use]
    pub fn current() -> Self {
        Self::default()
    }

    /// Always send `operator`, e.g. a service identity for background jobs.
    #[must_use]
    pub const fn fixed(operator: OperatorMetadata) -> Self {
        Self {
            fixed: Some(operator),
        }
    }
}

impl Interceptor for OperatorInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(operator) = self.fixed.clone().or_else(super::current) {
            attach(&mut request, &operator).map_err(|e| Status::internal(e.to_string()))?;
        }
        Ok(request)
    }
}

//! Envelope on HTTP headers.

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use super::{MetadataError, OPERATOR_HEADER, decode, encode};
use crate::proto::OperatorMetadata;

/// Read the envelope from headers.
///
/// # Errors
///
/// - [`MetadataError::NoMetadata`] when there are no headers
/// - [`MetadataError::NoOperatorHeader`] when the header is absent or empty
/// - decode errors from [`decode`]
pub fn from_headers(headers: &HeaderMap) -> Result<OperatorMetadata, MetadataError> {
    if headers.is_empty() {
        return Err(MetadataError::NoMetadata);
    }
    let value = headers
        .get(OPERATOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(MetadataError::NoOperatorHeader)?;
    decode(value)
}

/// Write the envelope into headers, replacing any previous value.
///
/// # Errors
///
/// Returns [`MetadataError::InvalidOperator`] if the encoded value is not a
/// valid header value.
pub fn inject_headers(headers: &mut HeaderMap, operator: &OperatorMetadata) -> Result<(), MetadataError> {
    let value = HeaderValue::from_str(&encode(operator)).map_err(|_| MetadataError::InvalidOperator {
        reason: "envelope is not a valid header value",
    })?;
    headers.insert(HeaderName::from_static(OPERATOR_HEADER), value);
    Ok(())
}

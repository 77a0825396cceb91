//! Values the auth layer attaches to a request.
//!
//! Each is stored in the `http::Request` extensions under its own type, so
//! handlers read them back by type.

use http::Extensions;

use crate::error::EdgeError;
use crate::proto::{OperatorMetadata, UserTokenPayload};
use crate::viewer::Viewer;

/// HTTP method stand-in used as the authz action for gRPC.
pub const ANY_ACTION: &str = "ANY";

/// Caller ids copied onto the request when the inject flags are on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorFields {
    /// User id of the caller
    pub operator_id: Option<u32>,
    /// Tenant id of the caller
    pub tenant_id: Option<u32>,
}

/// Input for the authorization engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthzClaims {
    /// Role codes of the caller
    pub subjects: Vec<String>,
    /// HTTP method, or [`ANY_ACTION`]
    pub action: String,
    /// Path template, or the gRPC operation
    pub resource: String,
}

/// Validated token payload.
///
/// # Errors
///
/// Returns [`EdgeError::MissingJwtToken`] when the auth layer did not run.
pub fn token_payload(extensions: &Extensions) -> Result<&UserTokenPayload, EdgeError> {
    extensions
        .get::<UserTokenPayload>()
        .ok_or(EdgeError::MissingJwtToken)
}

/// User id of the caller.
///
/// # Errors
///
/// See [`token_payload`].
pub fn user_id(extensions: &Extensions) -> Result<u32, EdgeError> {
    token_payload(extensions).map(|p| p.user_id)
}

/// Tenant id of the caller, 0 for platform context.
///
/// # Errors
///
/// See [`token_payload`].
pub fn tenant_id(extensions: &Extensions) -> Result<u32, EdgeError> {
    token_payload(extensions).map(UserTokenPayload::tenant_id)
}

/// Username of the caller.
///
/// # Errors
///
/// See [`token_payload`].
pub fn username(extensions: &Extensions) -> Result<&str, EdgeError> {
    token_payload(extensions).map(UserTokenPayload::username)
}

/// Viewer attached by the auth layer.
#[must_use]
pub fn viewer(extensions: &Extensions) -> Option<&Viewer> {
    extensions.get::<Viewer>()
}

/// Operator envelope attached by the auth layer.
#[must_use]
pub fn operator(extensions: &Extensions) -> Option<&OperatorMetadata> {
    extensions.get::<OperatorMetadata>()
}

/// Authorization claims attached by the auth layer.
#[must_use]
pub fn authz_claims(extensions: &Extensions) -> Option<&AuthzClaims> {
    extensions.get::<AuthzClaims>()
}

/// Injected caller ids.
#[must_use]
pub fn operator_fields(extensions: &Extensions) -> Option<OperatorFields> {
    extensions.get::<OperatorFields>().copied()
}

//! Bearer-token checking and claim mapping.

pub mod checker;
pub mod claims;
pub mod remote;

pub use checker::{AccessTokenChecker, ComposedChecker, SharedChecker};
pub use claims::{ClaimsError, TokenClaims, is_token_expired, is_token_not_valid_yet};
pub use remote::RemoteTokenChecker;

use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::operator::user_operator;
use crate::proto::{OperatorMetadata, UserTokenPayload};

const BEARER_PREFIX: &str = "Bearer ";

/// Token from `Authorization: Bearer <token>`, if present and non-empty.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Token payload read from the bearer token without verifying it.
///
/// Used where a record must be written even for rejected tokens.
#[must_use]
pub fn unverified_payload(headers: &HeaderMap) -> Option<UserTokenPayload> {
    let token = bearer_token(headers)?;
    match TokenClaims::parse_unverified(token).and_then(|claims| claims.to_payload()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!(error = %e, "Could not read bearer token claims");
            None
        }
    }
}

/// Envelope identity for a validated token.
#[must_use]
pub fn operator_from_payload(payload: &UserTokenPayload) -> OperatorMetadata {
    let mut operator = user_operator(
        u64::from(payload.user_id),
        u64::from(payload.tenant_id()),
        u64::from(payload.org_unit_id()),
        payload.data_scope(),
    );
    operator.role_codes.clone_from(&payload.roles);
    operator.client_id.clone_from(&payload.client_id);
    operator.device_id.clone_from(&payload.device_id);
    operator.jti.clone_from(&payload.jti);
    operator
}

//! JWT claim set and its mapping to [`UserTokenPayload`].
//!
//! Claims are read without verifying the signature. Verification belongs to
//! the authentication service; the edge only needs the claims for logging
//! and identity propagation of tokens that service already accepted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::proto::{DataScope, UserTokenPayload};

/// Username (`sub`).
pub const CLAIM_USERNAME: &str = "sub";
/// User id.
pub const CLAIM_USER_ID: &str = "uid";
/// Tenant id.
pub const CLAIM_TENANT_ID: &str = "tid";
/// Client id.
pub const CLAIM_CLIENT_ID: &str = "cid";
/// Device id.
pub const CLAIM_DEVICE_ID: &str = "did";
/// Role codes.
pub const CLAIM_ROLE_CODES: &str = "roc";
/// Data scope enum name.
pub const CLAIM_DATA_SCOPE: &str = "ds";
/// Org unit id.
pub const CLAIM_ORG_UNIT_ID: &str = "ouid";
/// Token id.
pub const CLAIM_JWT_ID: &str = "jti";
/// Expiration time.
pub const CLAIM_EXPIRATION: &str = "exp";
/// Not-before time.
pub const CLAIM_NOT_BEFORE: &str = "nbf";
/// Issued-at time.
pub const CLAIM_ISSUED_AT: &str = "iat";

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
pub const TOKEN_LEEWAY_SECS: i64 = 60;

/// Claim-set parsing errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    /// Not a three-segment JWT, or the claims segment is not a JSON object
    #[error("malformed token: {reason}")]
    Malformed {
        /// What was wrong
        reason: &'static str,
    },

    /// A claim has a type that cannot be mapped
    #[error("invalid claim '{claim}': {reason}")]
    InvalidClaim {
        /// Claim name
        claim: &'static str,
        /// What was wrong
        reason: &'static str,
    },
}

/// Decoded JWT claims.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenClaims(Map<String, Value>);

impl From<Map<String, Value>> for TokenClaims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TokenClaims {
    /// Decode the claims segment of `token` without checking the signature.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::Malformed`] when the token is not three
    /// dot-separated segments or the middle one is not a base64url JSON
    /// object.
    pub fn parse_unverified(token: &str) -> Result<Self, ClaimsError> {
        let mut segments = token.split('.');
        let (Some(_), Some(claims), Some(_), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(ClaimsError::Malformed {
                reason: "expected three segments",
            });
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(claims.trim_end_matches('='))
            .map_err(|_| ClaimsError::Malformed {
                reason: "claims segment is not base64url",
            })?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            _ => Err(ClaimsError::Malformed {
                reason: "claims segment is not a JSON object",
            }),
        }
    }

    /// Claims for `payload`, issued now.
    #[must_use]
    pub fn from_payload(payload: &UserTokenPayload, expires_at: Option<DateTime<Utc>>) -> Self {
        let mut map = Map::new();
        map.insert(CLAIM_USERNAME.into(), Value::from(payload.username()));
        map.insert(CLAIM_USER_ID.into(), Value::from(payload.user_id));
        map.insert(CLAIM_TENANT_ID.into(), Value::from(payload.tenant_id()));
        map.insert(CLAIM_ISSUED_AT.into(), Value::from(Utc::now().timestamp()));

        if let Some(exp) = expires_at {
            map.insert(CLAIM_EXPIRATION.into(), Value::from(exp.timestamp()));
        }
        if let Some(jti) = &payload.jti {
            map.insert(CLAIM_JWT_ID.into(), Value::from(jti.as_str()));
        }
        if !payload.roles.is_empty() {
            map.insert(CLAIM_ROLE_CODES.into(), Value::from(payload.roles.clone()));
        }
        if let Some(did) = &payload.device_id {
            map.insert(CLAIM_DEVICE_ID.into(), Value::from(did.as_str()));
        }
        if let Some(cid) = &payload.client_id {
            map.insert(CLAIM_CLIENT_ID.into(), Value::from(cid.as_str()));
        }
        if payload.data_scope.is_some() {
            map.insert(
                CLAIM_DATA_SCOPE.into(),
                Value::from(payload.data_scope().as_str_name()),
            );
        }
        if let Some(ouid) = payload.org_unit_id {
            map.insert(CLAIM_ORG_UNIT_ID.into(), Value::from(ouid));
        }
        Self(map)
    }

    /// Raw claim.
    #[must_use]
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// Underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn string(&self, claim: &str) -> Option<String> {
        match self.0.get(claim)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::String(_) | Value::Null => None,
            other => {
                warn!(claim, value = %other, "Ignoring non-string claim");
                None
            }
        }
    }

    fn uint32(&self, claim: &str) -> Option<u32> {
        let value = self.0.get(claim)?;
        let number = value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(truncate_f64)
        });
        match number.map(u32::try_from) {
            Some(Ok(n)) => Some(n),
            _ if value.is_null() => None,
            _ => {
                warn!(claim, value = %value, "Ignoring non-numeric claim");
                None
            }
        }
    }

    fn timestamp(&self, claim: &str) -> Option<DateTime<Utc>> {
        let value = self.0.get(claim)?;
        let secs = value.as_i64().or_else(|| value.as_f64().map(truncate_f64_signed))?;
        DateTime::from_timestamp(secs, 0)
    }

    /// `exp`, if present.
    #[must_use]
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CLAIM_EXPIRATION)
    }

    /// `nbf`, if present.
    #[must_use]
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CLAIM_NOT_BEFORE)
    }

    /// `iat`, if present.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CLAIM_ISSUED_AT)
    }

    /// Whether `now` is past `exp` plus leeway. No `exp` never expires.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time()
            .is_some_and(|exp| now > exp + chrono::Duration::seconds(TOKEN_LEEWAY_SECS))
    }

    /// Whether `now` plus leeway is still before `nbf`. No `nbf` is valid.
    #[must_use]
    pub fn is_not_valid_yet_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before()
            .is_some_and(|nbf| now + chrono::Duration::seconds(TOKEN_LEEWAY_SECS) < nbf)
    }

    /// [`is_expired_at`](Self::is_expired_at) against the wall clock.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// [`is_not_valid_yet_at`](Self::is_not_valid_yet_at) against the wall clock.
    #[must_use]
    pub fn is_not_valid_yet(&self) -> bool {
        self.is_not_valid_yet_at(Utc::now())
    }

    /// Map to a token payload.
    ///
    /// Numeric claims may be JSON floats. Unknown `ds` names are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::InvalidClaim`] when `roc` is present but not
    /// an array of strings.
    pub fn to_payload(&self) -> Result<UserTokenPayload, ClaimsError> {
        let mut payload = UserTokenPayload {
            username: self.string(CLAIM_USERNAME),
            jti: self.string(CLAIM_JWT_ID),
            user_id: self.uint32(CLAIM_USER_ID).unwrap_or_default(),
            tenant_id: self.uint32(CLAIM_TENANT_ID).filter(|t| *t != 0),
            org_unit_id: self.uint32(CLAIM_ORG_UNIT_ID).filter(|o| *o != 0),
            client_id: self.string(CLAIM_CLIENT_ID),
            device_id: self.string(CLAIM_DEVICE_ID),
            ..Default::default()
        };

        if let Some(scope) = self
            .string(CLAIM_DATA_SCOPE)
            .and_then(|ds| DataScope::from_str_name(&ds))
        {
            payload.set_data_scope(scope);
        }

        match self.0.get(CLAIM_ROLE_CODES) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                payload.roles = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or(ClaimsError::InvalidClaim {
                        claim: CLAIM_ROLE_CODES,
                        reason: "role codes must be strings",
                    })?;
            }
            Some(_) => {
                return Err(ClaimsError::InvalidClaim {
                    claim: CLAIM_ROLE_CODES,
                    reason: "role codes must be an array",
                });
            }
        }

        Ok(payload)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn truncate_f64(value: f64) -> u64 {
    value as u64
}

#[allow(clippy::cast_possible_truncation)]
const fn truncate_f64_signed(value: f64) -> i64 {
    value as i64
}

/// Expiry check where a missing claim set counts as expired.
#[must_use]
pub fn is_token_expired(claims: Option<&TokenClaims>) -> bool {
    claims.is_none_or(TokenClaims::is_expired)
}

/// Not-before check where a missing claim set counts as not yet valid.
#[must_use]
pub fn is_token_not_valid_yet(claims: Option<&TokenClaims>) -> bool {
    claims.is_none_or(TokenClaims::is_not_valid_yet)
}

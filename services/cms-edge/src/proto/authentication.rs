//! Authentication wire types: operator identity and token validation.

use super::identity::DataScope;

/// What kind of principal an operator is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperatorKind {
    /// Unset on the wire
    Unspecified = 0,
    /// Human user
    User = 1,
    /// Service identity
    Service = 2,
    /// System task
    System = 3,
}

/// Caller identity carried in the `x-md-operator` envelope.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct OperatorMetadata {
    /// Principal kind
    #[prost(enumeration = "OperatorKind", tag = "1")]
    pub kind: i32,
    /// User id, 0 for system operators
    #[prost(uint64, tag = "2")]
    pub user_id: u64,
    /// Tenant id, 0 for platform scope
    #[prost(uint64, tag = "3")]
    pub tenant_id: u64,
    /// Org unit id
    #[prost(uint64, tag = "4")]
    pub org_unit_id: u64,
    /// Granted data scope
    #[prost(enumeration = "DataScope", tag = "5")]
    pub data_scope: i32,
    /// Role ids
    #[prost(uint64, repeated, tag = "6")]
    pub role_ids: Vec<u64>,
    /// Role codes
    #[prost(string, repeated, tag = "7")]
    pub role_codes: Vec<String>,
    /// OAuth client id
    #[prost(string, optional, tag = "8")]
    pub client_id: Option<String>,
    /// Device id
    #[prost(string, optional, tag = "9")]
    pub device_id: Option<String>,
    /// Token id
    #[prost(string, optional, tag = "10")]
    pub jti: Option<String>,
}

/// Which token a validation request refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TokenCategory {
    /// Unset
    Unspecified = 0,
    /// Access token
    Access = 1,
    /// Refresh token
    Refresh = 2,
}

/// Gateway the token was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ClientType {
    /// Unset
    Unspecified = 0,
    /// Admin gateway
    Admin = 1,
    /// App gateway
    App = 2,
}

impl ClientType {
    /// Parse `admin` / `app`, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "app" => Some(Self::App),
            _ => None,
        }
    }
}

/// Claims the authentication service returns for a valid token.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct UserTokenPayload {
    /// Login name (`sub`)
    #[prost(string, optional, tag = "1")]
    pub username: Option<String>,
    /// User id (`uid`)
    #[prost(uint32, tag = "2")]
    pub user_id: u32,
    /// Tenant id (`tid`)
    #[prost(uint32, optional, tag = "3")]
    pub tenant_id: Option<u32>,
    /// Org unit id (`ouid`)
    #[prost(uint32, optional, tag = "4")]
    pub org_unit_id: Option<u32>,
    /// Role codes (`roc`)
    #[prost(string, repeated, tag = "5")]
    pub roles: Vec<String>,
    /// Client id (`cid`)
    #[prost(string, optional, tag = "6")]
    pub client_id: Option<String>,
    /// Device id (`did`)
    #[prost(string, optional, tag = "7")]
    pub device_id: Option<String>,
    /// Data scope (`ds`)
    #[prost(enumeration = "DataScope", optional, tag = "8")]
    pub data_scope: Option<i32>,
    /// Token id (`jti`)
    #[prost(string, optional, tag = "9")]
    pub jti: Option<String>,
}

/// `AuthenticationService.ValidateToken` request.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ValidateTokenRequest {
    /// Raw bearer token
    #[prost(string, tag = "1")]
    pub token: String,
    /// Token category
    #[prost(enumeration = "TokenCategory", tag = "2")]
    pub token_category: i32,
    /// Gateway the caller belongs to
    #[prost(enumeration = "ClientType", tag = "3")]
    pub client_type: i32,
    /// Bypass the revocation cache
    #[prost(bool, optional, tag = "4")]
    pub skip_redis: Option<bool>,
}

/// `AuthenticationService.ValidateToken` response.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ValidateTokenResponse {
    /// Whether the token is usable
    #[prost(bool, tag = "1")]
    pub is_valid: bool,
    /// Claims, present when valid
    #[prost(message, optional, tag = "2")]
    pub payload: Option<UserTokenPayload>,
}

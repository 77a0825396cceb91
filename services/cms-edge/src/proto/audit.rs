//! Audit record wire types.
//!
//! The binary encoding of these messages is what the record hash covers, so
//! tags must never be renumbered.

/// Coarse device classification from the user agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DeviceType {
    /// Unset
    Unspecified = 0,
    /// Desktop browser or app
    Desktop = 1,
    /// Tablet
    Tablet = 2,
    /// Phone
    Mobile = 3,
    /// Crawler or bot
    Bot = 4,
    /// Anything else
    Other = 5,
}

/// Login record action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ActionType {
    /// Unset
    Unspecified = 0,
    /// Login
    Login = 1,
    /// Logout
    Logout = 2,
}

/// Login outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Status {
    /// Unset
    Unspecified = 0,
    /// Succeeded
    Success = 1,
    /// Failed
    Failed = 2,
}

/// Login risk band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RiskLevel {
    /// Unset
    Unspecified = 0,
    /// Score up to 30
    Low = 1,
    /// Score up to 70
    Medium = 2,
    /// Score above 70
    High = 3,
}

/// Resolved location of the client address.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct GeoLocation {
    /// ISO country code
    #[prost(string, tag = "1")]
    pub country_code: String,
    /// Province or region
    #[prost(string, tag = "2")]
    pub province: String,
    /// City
    #[prost(string, tag = "3")]
    pub city: String,
    /// Network operator
    #[prost(string, tag = "4")]
    pub isp: String,
}

/// Parsed user agent.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct DeviceInfo {
    /// Raw `User-Agent`
    #[prost(string, tag = "1")]
    pub user_agent: String,
    /// Device class
    #[prost(enumeration = "DeviceType", tag = "2")]
    pub device_type: i32,
    /// Device name, or `PC` for desktops
    #[prost(string, tag = "3")]
    pub client_name: String,
    /// Browser name
    #[prost(string, tag = "4")]
    pub browser_name: String,
    /// Browser version
    #[prost(string, tag = "5")]
    pub browser_version: String,
    /// OS name
    #[prost(string, tag = "6")]
    pub os_name: String,
    /// OS version
    #[prost(string, tag = "7")]
    pub os_version: String,
    /// Platform label such as `Web` or `AndroidApp`
    #[prost(string, tag = "8")]
    pub platform: String,
    /// Client id
    #[prost(string, tag = "9")]
    pub client_id: String,
}

/// One audited API call.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ApiAuditLog {
    /// Tenant id
    #[prost(uint32, optional, tag = "1")]
    pub tenant_id: Option<u32>,
    /// User id
    #[prost(uint32, optional, tag = "2")]
    pub user_id: Option<u32>,
    /// Username
    #[prost(string, tag = "3")]
    pub username: String,
    /// Client address
    #[prost(string, tag = "4")]
    pub ip_address: String,
    /// Client location
    #[prost(message, optional, tag = "5")]
    pub geo_location: Option<GeoLocation>,
    /// Client device
    #[prost(message, optional, tag = "6")]
    pub device_info: Option<DeviceInfo>,
    /// Decoded `Referer`
    #[prost(string, tag = "7")]
    pub referer: String,
    /// HTTP method
    #[prost(string, tag = "8")]
    pub http_method: String,
    /// Operation name
    #[prost(string, tag = "9")]
    pub api_operation: String,
    /// Templated route path
    #[prost(string, tag = "10")]
    pub path: String,
    /// Decoded request URI
    #[prost(string, tag = "11")]
    pub request_uri: String,
    /// Request body
    #[prost(string, tag = "12")]
    pub request_body: String,
    /// Request id
    #[prost(string, tag = "13")]
    pub request_id: String,
    /// Response status
    #[prost(uint32, tag = "14")]
    pub status_code: u32,
    /// Error reason
    #[prost(string, tag = "15")]
    pub reason: String,
    /// Whether the status is below 400
    #[prost(bool, tag = "16")]
    pub success: bool,
    /// Handler latency
    #[prost(uint64, tag = "17")]
    pub latency_ms: u64,
    /// Hex SHA-256 over the record with hash and signature cleared
    #[prost(string, optional, tag = "18")]
    pub log_hash: Option<String>,
    /// DER ECDSA signature
    #[prost(bytes = "vec", optional, tag = "19")]
    pub signature: Option<Vec<u8>>,
    /// Creation time
    #[prost(message, optional, tag = "20")]
    pub created_at: Option<prost_types::Timestamp>,
}

/// One audited login or logout.
#[derive(Clone, PartialEq, prost::Message)]
pub struct LoginAuditLog {
    /// Tenant id
    #[prost(uint32, optional, tag = "1")]
    pub tenant_id: Option<u32>,
    /// User id
    #[prost(uint32, optional, tag = "2")]
    pub user_id: Option<u32>,
    /// Username
    #[prost(string, tag = "3")]
    pub username: String,
    /// Client address
    #[prost(string, tag = "4")]
    pub ip_address: String,
    /// Client location
    #[prost(message, optional, tag = "5")]
    pub geo_location: Option<GeoLocation>,
    /// Client device
    #[prost(message, optional, tag = "6")]
    pub device_info: Option<DeviceInfo>,
    /// Request id
    #[prost(string, tag = "7")]
    pub request_id: String,
    /// Session id
    #[prost(string, tag = "8")]
    pub session_id: String,
    /// Login or logout
    #[prost(enumeration = "ActionType", tag = "9")]
    pub action_type: i32,
    /// Outcome
    #[prost(enumeration = "Status", tag = "10")]
    pub status: i32,
    /// MFA state reported by the login flow
    #[prost(string, tag = "11")]
    pub mfa_status: String,
    /// Failure reason
    #[prost(string, tag = "12")]
    pub failure_reason: String,
    /// Heuristic risk, 0 to 100
    #[prost(uint32, tag = "13")]
    pub risk_score: u32,
    /// Risk band
    #[prost(enumeration = "RiskLevel", tag = "14")]
    pub risk_level: i32,
    /// Sorted risk factors
    #[prost(string, repeated, tag = "15")]
    pub risk_factors: Vec<String>,
    /// Hex SHA-256 over the record with hash and signature cleared
    #[prost(string, optional, tag = "16")]
    pub log_hash: Option<String>,
    /// DER ECDSA signature
    #[prost(bytes = "vec", optional, tag = "17")]
    pub signature: Option<Vec<u8>>,
    /// Creation time
    #[prost(message, optional, tag = "18")]
    pub created_at: Option<prost_types::Timestamp>,
}

//! Wire types shared with the authentication and audit services.
//!
//! The messages are declared with `prost` derives so the binary layout is
//! fixed by the field tags below rather than by a build step.

pub mod audit;
pub mod authentication;
pub mod identity;

pub use audit::{
    ActionType, ApiAuditLog, DeviceInfo, DeviceType, GeoLocation, LoginAuditLog, RiskLevel, Status,
};
pub use authentication::{
    ClientType, OperatorKind, OperatorMetadata, TokenCategory, UserTokenPayload,
    ValidateTokenRequest, ValidateTokenResponse,
};
pub use identity::{DataScope, DataScopeList, ScopeType};

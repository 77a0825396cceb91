//! Error handling for the edge pipeline
//!
//! Authentication failures all surface as HTTP 401 / gRPC `Unauthenticated`
//! with reason `UNAUTHORIZED`. Client-facing messages are sanitized.

use thiserror::Error;
use tonic::{Code, Status};
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::operator::MetadataError;

/// Reason string attached to every authentication failure.
pub const UNAUTHORIZED_REASON: &str = "UNAUTHORIZED";

/// Sensitive patterns that should be sanitized from error messages
const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "credential",
    "bearer",
    "authorization",
    "api_key",
    "apikey",
    "private",
];

/// Non-exhaustive error enum for forward compatibility
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EdgeError {
    /// No `Authorization: Bearer` header
    #[error("missing bearer token")]
    MissingBearerToken,

    /// Token rejected for any reason
    #[error("access token expired")]
    AccessTokenExpired,

    /// Middleware has no token checker
    #[error("access token checker is not configured")]
    AccessTokenCheckerNotConfigured,

    /// Middleware invoked without transport route information
    #[error("wrong context for middleware")]
    WrongContext,

    /// No token payload in the request context
    #[error("no jwt token in context")]
    MissingJwtToken,

    /// Request could not be read
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong
        reason: String,
    },

    /// Operator envelope missing or malformed
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Field encryption failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Handler refused the request with an explicit status
    #[error("{reason}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Machine-readable reason
        reason: String,
    },

    /// Internal error (details sanitized in responses)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Error codes for gRPC/API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No bearer token
    MissingBearerToken,
    /// Invalid or expired token
    AccessTokenExpired,
    /// No token checker configured
    CheckerNotConfigured,
    /// Missing transport context
    WrongContext,
    /// No token payload in context
    MissingJwtToken,
    /// Unreadable request
    InvalidRequest,
    /// Bad operator envelope
    InvalidOperator,
    /// Encryption failure
    CryptoError,
    /// Explicit handler rejection
    Rejected,
    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingBearerToken => "AUTH_MISSING_BEARER_TOKEN",
            Self::AccessTokenExpired => "AUTH_ACCESS_TOKEN_EXPIRED",
            Self::CheckerNotConfigured => "AUTH_CHECKER_NOT_CONFIGURED",
            Self::WrongContext => "AUTH_WRONG_CONTEXT",
            Self::MissingJwtToken => "AUTH_MISSING_JWT_TOKEN",
            Self::InvalidRequest => "AUTH_INVALID_REQUEST",
            Self::InvalidOperator => "AUTH_INVALID_OPERATOR",
            Self::CryptoError => "CRYPTO_ERROR",
            Self::Rejected => "REJECTED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Get the gRPC status code for this error
    #[must_use]
    pub const fn grpc_code(&self) -> Code {
        match self {
            Self::MissingBearerToken
            | Self::AccessTokenExpired
            | Self::CheckerNotConfigured
            | Self::WrongContext
            | Self::MissingJwtToken
            | Self::InvalidRequest
            | Self::InvalidOperator => Code::Unauthenticated,
            Self::Rejected => Code::Unknown,
            Self::CryptoError | Self::Internal => Code::Internal,
        }
    }
}

/// Structured error response with correlation ID
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// gRPC status code
    pub grpc_code: Code,
    /// Human-readable message (sanitized)
    pub message: String,
    /// Correlation ID for tracing
    pub correlation_id: Uuid,
}

impl ErrorResponse {
    /// Create a new error response from an [`EdgeError`]
    #[must_use]
    pub fn from_error(error: &EdgeError, correlation_id: Uuid) -> Self {
        let message = match error {
            EdgeError::Crypto(_) => "Encryption operation failed".to_string(),
            // Never expose internal error details
            EdgeError::Internal(_) => "Internal error".to_string(),
            other => sanitize_message(&other.to_string()),
        };
        Self {
            code: error.code(),
            grpc_code: error.grpc_code(),
            message,
            correlation_id,
        }
    }

    /// Convert to gRPC Status
    #[must_use]
    pub fn to_status(&self) -> Status {
        let message = format!("{} [correlation_id: {}]", self.message, self.correlation_id);
        Status::new(self.grpc_code, message)
    }
}

impl EdgeError {
    /// Handler rejection with an explicit status.
    #[must_use]
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Get the error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingBearerToken => ErrorCode::MissingBearerToken,
            Self::AccessTokenExpired => ErrorCode::AccessTokenExpired,
            Self::AccessTokenCheckerNotConfigured => ErrorCode::CheckerNotConfigured,
            Self::WrongContext => ErrorCode::WrongContext,
            Self::MissingJwtToken => ErrorCode::MissingJwtToken,
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::Metadata(_) => ErrorCode::InvalidOperator,
            Self::Crypto(_) => ErrorCode::CryptoError,
            Self::Rejected { .. } => ErrorCode::Rejected,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// gRPC code, taking an explicit rejection status into account.
    #[must_use]
    pub const fn grpc_code(&self) -> Code {
        match self {
            Self::Rejected { status, .. } => grpc_code_for_http(*status),
            other => other.code().grpc_code(),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Rejected { status, .. } => *status,
            Self::Crypto(_) | Self::Internal(_) => 500,
            _ => 401,
        }
    }

    /// Machine-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Rejected { reason, .. } => reason,
            Self::Crypto(_) => ErrorCode::CryptoError.as_str(),
            Self::Internal(_) => ErrorCode::Internal.as_str(),
            _ => UNAUTHORIZED_REASON,
        }
    }

    /// Convert to gRPC Status with correlation ID
    #[must_use]
    pub fn to_status(&self, correlation_id: Uuid) -> Status {
        ErrorResponse::from_error(self, correlation_id).to_status()
    }

    /// Check if this error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Rejected { status: 429 | 502 | 503 | 504, .. })
    }
}

const fn grpc_code_for_http(status: u16) -> Code {
    match status {
        400 => Code::InvalidArgument,
        401 => Code::Unauthenticated,
        403 => Code::PermissionDenied,
        404 => Code::NotFound,
        409 => Code::AlreadyExists,
        429 => Code::ResourceExhausted,
        499 => Code::Cancelled,
        501 => Code::Unimplemented,
        503 => Code::Unavailable,
        504 => Code::DeadlineExceeded,
        s if s >= 500 => Code::Internal,
        _ => Code::Unknown,
    }
}

/// Sanitize a message by removing sensitive information
fn sanitize_message(message: &str) -> String {
    if contains_sensitive_info(message) {
        return "Authentication failed".to_string();
    }
    message.to_string()
}

/// Check if a string contains sensitive information
#[must_use]
pub fn contains_sensitive_info(text: &str) -> bool {
    let lower = text.to_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

impl From<std::convert::Infallible> for EdgeError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl From<Status> for EdgeError {
    fn from(status: Status) -> Self {
        let (http, reason) = match status.code() {
            Code::Ok => (200, "OK"),
            Code::InvalidArgument => (400, "INVALID_ARGUMENT"),
            Code::FailedPrecondition => (400, "FAILED_PRECONDITION"),
            Code::OutOfRange => (400, "OUT_OF_RANGE"),
            Code::Unauthenticated => (401, UNAUTHORIZED_REASON),
            Code::PermissionDenied => (403, "PERMISSION_DENIED"),
            Code::NotFound => (404, "NOT_FOUND"),
            Code::AlreadyExists => (409, "ALREADY_EXISTS"),
            Code::Aborted => (409, "ABORTED"),
            Code::ResourceExhausted => (429, "RESOURCE_EXHAUSTED"),
            Code::Cancelled => (499, "CANCELLED"),
            Code::Unimplemented => (501, "UNIMPLEMENTED"),
            Code::Unavailable => (503, "UNAVAILABLE"),
            Code::DeadlineExceeded => (504, "DEADLINE_EXCEEDED"),
            Code::Unknown => (500, "UNKNOWN"),
            Code::Internal => (500, "INTERNAL"),
            Code::DataLoss => (500, "DATA_LOSS"),
        };
        Self::rejected(http, reason)
    }
}

/// Result alias for the edge pipeline
pub type Result<T> = std::result::Result<T, EdgeError>;

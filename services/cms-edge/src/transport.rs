//! Transport facts the gateway router attaches to each inbound request.
//!
//! The router inserts a [`RouteInfo`] (and, when known, a [`RemoteAddr`])
//! into the `http::Request` extensions before the edge layers run.

use std::net::SocketAddr;

/// Inbound transport kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// HTTP/JSON gateway route
    #[default]
    Http,
    /// gRPC method
    Grpc,
}

/// Matched route of the current request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteInfo {
    /// Operation id, e.g. `/admin.service.v1.UserService/GetUser`
    pub operation: String,
    /// Templated path, e.g. `/admin/v1/users/{id}`; empty for gRPC
    pub path_template: String,
    /// Transport kind
    pub kind: TransportKind,
}

impl RouteInfo {
    /// HTTP route.
    #[must_use]
    pub fn http(operation: impl Into<String>, path_template: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            path_template: path_template.into(),
            kind: TransportKind::Http,
        }
    }

    /// gRPC method.
    #[must_use]
    pub fn grpc(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            path_template: String::new(),
            kind: TransportKind::Grpc,
        }
    }

    /// Whether this is an HTTP route.
    #[must_use]
    pub fn is_http(&self) -> bool {
        self.kind == TransportKind::Http
    }
}

/// Socket peer as reported by the transport.
///
/// Kept as the raw `host:port` string so malformed peers can still be
/// logged as empty rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

impl From<SocketAddr> for RemoteAddr {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

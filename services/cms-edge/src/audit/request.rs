//! Request facts shared by both audit record kinds.

use std::net::{IpAddr, SocketAddr};
use std::sync::LazyLock;

use http::HeaderMap;
use percent_encoding::percent_decode_str;
use regex::bytes::Regex;
use sha2::{Digest, Sha256};

use crate::error::EdgeError;
use crate::proto::UserTokenPayload;
use crate::transport::RemoteAddr;

/// `User-Agent`
pub const HEADER_USER_AGENT: &str = "user-agent";
/// `Referer`
pub const HEADER_REFERER: &str = "referer";
/// `X-Request-ID`
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// `X-Correlation-ID`
pub const HEADER_CORRELATION_ID: &str = "x-correlation-id";
/// `X-Fc-Request-ID`
pub const HEADER_FC_REQUEST_ID: &str = "x-fc-request-id";
/// `X-Forwarded-For`
pub const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";
/// `X-Real-IP`
pub const HEADER_REAL_IP: &str = "x-real-ip";
/// `X-Client-IP`, which carries a client id rather than an address
pub const HEADER_CLIENT_ID: &str = "x-client-ip";

static USERNAME_JSON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""username"\s*:\s*"([^"]+)""#).ok());

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Client address: first valid `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the socket peer. Empty when none is a valid IP.
#[must_use]
pub fn client_ip(headers: &HeaderMap, remote: Option<&RemoteAddr>) -> String {
    if let Some(xff) = header(headers, HEADER_FORWARDED_FOR) {
        if let Some(ip) = xff
            .split(',')
            .map(str::trim)
            .find(|ip| ip.parse::<IpAddr>().is_ok())
        {
            return ip.to_string();
        }
    }

    if let Some(xri) = header(headers, HEADER_REAL_IP) {
        if xri.parse::<IpAddr>().is_ok() {
            return xri.to_string();
        }
    }

    remote.map(|r| ip_from_remote_addr(&r.0)).unwrap_or_default()
}

/// Address part of a `host:port`, `[v6]:port` or bare IP peer string.
#[must_use]
pub fn ip_from_remote_addr(addr: &str) -> String {
    if addr.contains(':') {
        if let Ok(socket) = addr.trim().parse::<SocketAddr>() {
            return socket.ip().to_string();
        }
    }
    if addr.parse::<IpAddr>().is_ok() {
        return addr.to_string();
    }
    String::new()
}

/// `X-Request-ID`, then `X-Correlation-ID`, then `X-Fc-Request-ID`.
#[must_use]
pub fn request_id(headers: &HeaderMap) -> String {
    [HEADER_REQUEST_ID, HEADER_CORRELATION_ID, HEADER_FC_REQUEST_ID]
        .into_iter()
        .find_map(|name| header(headers, name))
        .unwrap_or_default()
        .to_string()
}

/// `X-Client-IP` header, then the token's client id.
#[must_use]
pub fn client_id(headers: &HeaderMap, payload: Option<&UserTokenPayload>) -> String {
    header(headers, HEADER_CLIENT_ID)
        .map(str::to_string)
        .or_else(|| payload.map(|p| p.client_id().to_string()))
        .unwrap_or_default()
}

/// Username from a JSON or form-encoded login body.
#[must_use]
pub fn username_from_body(body: &[u8]) -> Option<String> {
    if let Some(caps) = USERNAME_JSON.as_ref().and_then(|re| re.captures(body)) {
        return Some(String::from_utf8_lossy(&caps[1]).into_owned());
    }
    url::form_urlencoded::parse(body)
        .find(|(key, value)| key == "username" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Query-unescape a header or URI for logging. `+` decodes to a space.
/// Invalid UTF-8 after decoding leaves the input unchanged.
#[must_use]
pub fn unescape(value: &str) -> String {
    let plus_decoded = value.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8()
        .map_or_else(|_| value.to_string(), |s| s.into_owned())
}

/// Hex SHA-256 of a token, for storing token references without the token.
#[must_use]
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Status code, reason and success flag of a finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// HTTP status
    pub status_code: u32,
    /// Machine-readable reason, empty on success
    pub reason: String,
    /// Status below 400
    pub success: bool,
}

impl Outcome {
    /// Outcome of a response status.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self {
            status_code: u32::from(status),
            reason: String::new(),
            success: status < 400,
        }
    }

    /// Outcome of an error.
    #[must_use]
    pub fn from_error(error: &EdgeError) -> Self {
        let status = error.http_status();
        Self {
            status_code: u32::from(status),
            reason: error.reason().to_string(),
            success: status < 400,
        }
    }
}

//! Viewer propagation over message-broker headers.
//!
//! Publishing writes the current [`Viewer`] as a set of structured headers
//! rather than a single envelope, so messages stay readable when inspected
//! on the broker. Subscribing rebuilds the viewer and runs the handler
//! inside it.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use prost::Message;
use tracing::warn;

use crate::observability::current_trace_id;
use crate::proto::DataScopeList;
use crate::viewer::{UserViewer, Viewer};

/// Trace id, hex
pub const HEADER_TRACE_ID: &str = "x-trace-id";
/// User id, decimal
pub const HEADER_USER_ID: &str = "x-user-id";
/// Tenant id, decimal
pub const HEADER_TENANT_ID: &str = "x-tenant-id";
/// Org unit id, decimal
pub const HEADER_ORG_UNIT_ID: &str = "x-orgunit-id";
/// Scope tags as protobuf bytes
pub const HEADER_DATA_SCOPE: &str = "x-data-scope";
/// Permission codes, comma separated
pub const HEADER_PERMISSIONS: &str = "x-perms";
/// Role codes, comma separated
pub const HEADER_ROLES: &str = "x-roles";
/// `true` for a system publisher
pub const HEADER_SYSTEM: &str = "x-system";

/// A broker message: raw headers and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Header values; some are binary
    pub headers: HashMap<String, Bytes>,
    /// Payload
    pub body: Bytes,
}

impl BrokerMessage {
    /// Message with no headers.
    #[must_use]
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, key: &str, value: impl Into<Bytes>) {
        self.headers.insert(key.to_string(), value.into());
    }

    /// Text header value; `None` when absent or not UTF-8.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        text_header(&self.headers, key)
    }
}

fn text_header<'a>(headers: &'a HashMap<String, Bytes>, key: &str) -> Option<&'a str> {
    headers
        .get(key)
        .and_then(|v| std::str::from_utf8(v).ok())
        .filter(|v| !v.is_empty())
}

/// Write `viewer` into `headers`.
pub fn viewer_to_headers(viewer: &Viewer, headers: &mut HashMap<String, Bytes>) {
    let mut set = |key: &str, value: String| {
        headers.insert(key.to_string(), Bytes::from(value));
    };

    if viewer.is_system_context() {
        set(HEADER_SYSTEM, "true".to_string());
        return;
    }

    let trace_id = Some(viewer.trace_id())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(current_trace_id);
    if let Some(trace_id) = trace_id {
        set(HEADER_TRACE_ID, trace_id);
    }

    set(HEADER_USER_ID, viewer.user_id().to_string());
    set(HEADER_TENANT_ID, viewer.tenant_id().to_string());
    set(HEADER_ORG_UNIT_ID, viewer.org_unit_id().to_string());
    if !viewer.permissions().is_empty() {
        set(HEADER_PERMISSIONS, viewer.permissions().join(","));
    }
    if !viewer.roles().is_empty() {
        set(HEADER_ROLES, viewer.roles().join(","));
    }

    if !viewer.data_scopes().is_empty() {
        let scopes = DataScopeList::from_scopes(viewer.data_scopes()).encode_to_vec();
        headers.insert(HEADER_DATA_SCOPE.to_string(), Bytes::from(scopes));
    }
}

// Accepts the spellings of Go's strconv.ParseBool.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse_id(headers: &HashMap<String, Bytes>, key: &str) -> u64 {
    let Some(value) = text_header(headers, key) else {
        return 0;
    };
    value.parse().unwrap_or_else(|e| {
        warn!(header = key, value, error = %e, "Invalid id header on broker message");
        0
    })
}

fn parse_list(headers: &HashMap<String, Bytes>, key: &str) -> Vec<String> {
    text_header(headers, key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Viewer carried by `headers`; `None` when there are no headers at all.
#[must_use]
pub fn headers_to_viewer(headers: &HashMap<String, Bytes>) -> Option<Viewer> {
    if headers.is_empty() {
        return None;
    }

    if let Some(value) = text_header(headers, HEADER_SYSTEM) {
        match parse_bool(value) {
            Some(true) => return Some(Viewer::System),
            Some(false) => {}
            None => warn!(value, "Invalid system context header on broker message"),
        }
    }

    let data_scopes = match headers.get(HEADER_DATA_SCOPE).filter(|v| !v.is_empty()) {
        Some(raw) => DataScopeList::decode(raw.as_ref()).map_or_else(
            |e| {
                warn!(error = %e, "Failed to decode data scope header on broker message");
                Vec::new()
            },
            |list| list.to_scopes(),
        ),
        None => Vec::new(),
    };

    let viewer = UserViewer::with_data_scopes(
        parse_id(headers, HEADER_USER_ID),
        parse_id(headers, HEADER_TENANT_ID),
        parse_id(headers, HEADER_ORG_UNIT_ID),
        text_header(headers, HEADER_TRACE_ID).unwrap_or_default(),
        data_scopes,
    )
    .with_roles(parse_list(headers, HEADER_ROLES))
    .with_permissions(parse_list(headers, HEADER_PERMISSIONS));

    Some(Viewer::User(viewer))
}

/// Sends messages to a broker.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `message` on `topic`.
    async fn publish(&self, topic: &str, message: BrokerMessage) -> anyhow::Result<()>;
}

/// Stamps the current viewer on every published message.
#[derive(Debug, Clone)]
pub struct ViewerPublisher<P> {
    inner: P,
}

impl<P> ViewerPublisher<P> {
    /// Wrap `inner`.
    pub const fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: Publisher> Publisher for ViewerPublisher<P> {
    async fn publish(&self, topic: &str, mut message: BrokerMessage) -> anyhow::Result<()> {
        match Viewer::current() {
            Some(viewer) => viewer_to_headers(&viewer, &mut message.headers),
            None => warn!(topic, "No viewer in scope for broker publish"),
        }
        self.inner.publish(topic, message).await
    }
}

/// Consumes messages from a broker.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one message.
    async fn handle(&self, topic: &str, message: BrokerMessage) -> anyhow::Result<()>;
}

/// Runs the inner handler under the viewer the message carries.
#[derive(Debug, Clone)]
pub struct ViewerSubscriber<H> {
    inner: H,
}

impl<H> ViewerSubscriber<H> {
    /// Wrap `inner`.
    pub const fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: MessageHandler> MessageHandler for ViewerSubscriber<H> {
    async fn handle(&self, topic: &str, message: BrokerMessage) -> anyhow::Result<()> {
        match headers_to_viewer(&message.headers) {
            Some(viewer) => viewer.scope(self.inner.handle(topic, message)).await,
            None => self.inner.handle(topic, message).await,
        }
    }
}

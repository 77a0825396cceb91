//! Record assembly and emission.
//!
//! Every request produces at most one record: a login record for the login
//! and logout operations, an api record for anything else except login.
//! Records are hashed, signed and handed to the sink under a system viewer.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use cms_eventbus::{Event, events};
use http::HeaderMap;
use serde_json::json;
use tracing::{debug, error};

use crate::audit::device::device_info;
use crate::audit::geo;
use crate::audit::options::AuditOptions;
use crate::audit::record::{AuditRecord, seal};
use crate::audit::request::{
    HEADER_REFERER, Outcome, client_ip, request_id, unescape, username_from_body,
};
use crate::audit::risk;
use crate::audit::signer::AuditSigner;
use crate::proto::{ActionType, ApiAuditLog, LoginAuditLog, Status, UserTokenPayload};
use crate::token::unverified_payload;
use crate::transport::{RemoteAddr, RouteInfo};
use crate::viewer::Viewer;

const EVENT_SOURCE: &str = "cms-edge";

/// What the audit path needs from a request, captured before the handler
/// consumes it.
#[derive(Debug, Clone)]
pub struct RequestFacts {
    /// HTTP method
    pub method: String,
    /// Path and query as received
    pub uri: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Buffered body
    pub body: Bytes,
    /// Matched route; the raw path stands in when the router set none
    pub route: RouteInfo,
    /// Socket peer
    pub remote: Option<RemoteAddr>,
}

impl RequestFacts {
    /// Capture the facts of `req`.
    #[must_use]
    pub fn from_request(req: &http::Request<Bytes>) -> Self {
        let uri = req.uri();
        let route = req
            .extensions()
            .get::<RouteInfo>()
            .cloned()
            .unwrap_or_else(|| RouteInfo::http(uri.path(), uri.path()));
        Self {
            method: req.method().as_str().to_string(),
            uri: uri
                .path_and_query()
                .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string()),
            headers: req.headers().clone(),
            body: req.body().clone(),
            route,
            remote: req.extensions().get::<RemoteAddr>().cloned(),
        }
    }

    fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

/// Builds, seals and emits audit records.
#[derive(Debug, Clone)]
pub struct Auditor {
    options: Arc<AuditOptions>,
}

impl Auditor {
    /// Auditor over `options`.
    ///
    /// Without a configured signer an ephemeral key is generated here.
    #[must_use]
    pub fn new(mut options: AuditOptions) -> Self {
        if options.signer.is_none() {
            match AuditSigner::ephemeral() {
                Ok(signer) => options.signer = Some(signer),
                Err(e) => error!(target: "audit", error = %e, "Failed to generate audit signing key"),
            }
        }
        Self {
            options: Arc::new(options),
        }
    }

    /// Key that signs every record.
    #[must_use]
    pub fn signer(&self) -> Option<&AuditSigner> {
        self.options.signer.as_ref()
    }

    /// Options in use.
    #[must_use]
    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    fn is_login_flow(&self, operation: &str) -> bool {
        operation == self.options.login_operation || operation == self.options.logout_operation
    }

    /// Api record for a finished request, or `None` for the login operation.
    pub async fn api_record(
        &self,
        facts: &RequestFacts,
        payload: Option<&UserTokenPayload>,
        outcome: &Outcome,
        latency: Duration,
    ) -> Option<ApiAuditLog> {
        if facts.route.operation == self.options.login_operation {
            return None;
        }

        let ip = client_ip(&facts.headers, facts.remote.as_ref());
        let mut record = ApiAuditLog {
            http_method: facts.method.clone(),
            api_operation: facts.route.operation.clone(),
            path: facts.route.path_template.clone(),
            referer: unescape(facts.header(HEADER_REFERER)),
            request_uri: unescape(&facts.uri),
            request_body: String::from_utf8_lossy(&facts.body).into_owned(),
            request_id: request_id(&facts.headers),
            geo_location: Some(geo::resolve(self.options.geo.as_ref(), &ip).await),
            device_info: Some(device_info(&facts.headers, payload)),
            ip_address: ip,
            status_code: outcome.status_code,
            reason: outcome.reason.clone(),
            success: outcome.success,
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            created_at: Some(SystemTime::now().into()),
            ..Default::default()
        };
        if let Some(payload) = payload {
            record.user_id = Some(payload.user_id);
            record.tenant_id = payload.tenant_id;
            record.username = payload.username.clone().unwrap_or_default();
        }

        self.seal(&mut record);
        Some(record)
    }

    /// Login record for the login and logout operations, `None` otherwise.
    pub async fn login_record(
        &self,
        facts: &RequestFacts,
        payload: Option<&UserTokenPayload>,
        outcome: &Outcome,
    ) -> Option<LoginAuditLog> {
        let operation = facts.route.operation.as_str();
        if !self.is_login_flow(operation) {
            return None;
        }

        let ip = client_ip(&facts.headers, facts.remote.as_ref());
        let mut record = LoginAuditLog {
            geo_location: Some(geo::resolve(self.options.geo.as_ref(), &ip).await),
            ip_address: ip,
            created_at: Some(SystemTime::now().into()),
            username: username_from_body(&facts.body).unwrap_or_default(),
            device_info: Some(device_info(&facts.headers, payload)),
            request_id: request_id(&facts.headers),
            failure_reason: outcome.reason.clone(),
            ..Default::default()
        };
        record.set_action_type(if operation == self.options.login_operation {
            ActionType::Login
        } else {
            ActionType::Logout
        });
        record.set_status(if outcome.success {
            Status::Success
        } else {
            Status::Failed
        });

        if let Some(payload) = payload {
            record.user_id = Some(payload.user_id);
            record.tenant_id = payload.tenant_id;
            if record.username.is_empty() {
                record.username = payload.username.clone().unwrap_or_default();
            }
        }

        risk::assess(&mut record);
        self.seal(&mut record);
        Some(record)
    }

    fn seal<R: AuditRecord>(&self, record: &mut R) {
        if let Err(e) = seal(record, self.options.signer.as_ref()) {
            error!(target: "audit", kind = R::KIND, error = %e, "Failed to sign audit record");
        }
    }

    /// Build the record for a finished request and hand it to the sink.
    ///
    /// Never fails: every error is logged and dropped.
    pub async fn emit(&self, facts: RequestFacts, outcome: Outcome, latency: Duration) {
        let payload = unverified_payload(&facts.headers);

        if let Some(record) = self.login_record(&facts, payload.as_ref(), &outcome).await {
            self.publish_login_event(&record);
            if let Some(sink) = &self.options.sink {
                let result = Viewer::System.scope(sink.write_login(record)).await;
                self.finish(LoginAuditLog::KIND, result);
            }
        }

        if let Some(record) = self
            .api_record(&facts, payload.as_ref(), &outcome, latency)
            .await
        {
            if let Some(sink) = &self.options.sink {
                let result = Viewer::System.scope(sink.write_api(record)).await;
                self.finish(ApiAuditLog::KIND, result);
            } else {
                debug!(target: "audit", operation = %record.api_operation, "No audit sink configured");
            }
        }
    }

    fn finish(&self, kind: &'static str, result: anyhow::Result<()>) {
        if let Err(e) = &result {
            error!(target: "audit", kind, error = %e, "Failed to write audit record");
        }
        if let Some(metrics) = &self.options.metrics {
            metrics.record_audit(kind, result.is_ok());
        }
    }

    fn publish_login_event(&self, record: &LoginAuditLog) {
        let Some(bus) = &self.options.events else {
            return;
        };
        if record.status() != Status::Success {
            return;
        }
        let event_type = match record.action_type() {
            ActionType::Login => events::USER_LOGGED_IN,
            ActionType::Logout => events::USER_LOGGED_OUT,
            ActionType::Unspecified => return,
        };
        let data = json!({
            "user_id": record.user_id(),
            "username": record.username,
            "tenant_id": record.tenant_id(),
            "ip_address": record.ip_address,
        });
        bus.publish_async(Event::new(event_type, data).with_source(EVENT_SOURCE));
    }
}

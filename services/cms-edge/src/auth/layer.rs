//! Auth Tower Layer
//!
//! Validates the bearer token and attaches the caller's identity to the
//! request before the handler runs.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::future::BoxFuture;
use tower::{Layer, Service};
use tracing::{debug, error, warn};

use crate::auth::context::{ANY_ACTION, AuthzClaims, OperatorFields};
use crate::auth::options::AuthOptions;
use crate::error::EdgeError;
use crate::observability::{current_trace_id, trace_id_from_traceparent};
use crate::operator;
use crate::proto::{OperatorMetadata, UserTokenPayload};
use crate::token::{bearer_token, operator_from_payload};
use crate::transport::RouteInfo;
use crate::viewer::{UserViewer, Viewer};

const TRACEPARENT_HEADER: &str = "traceparent";

/// Auth layer for Tower
#[derive(Debug, Clone)]
pub struct AuthLayer {
    options: Arc<AuthOptions>,
}

impl AuthLayer {
    /// Creates a new auth layer
    #[must_use]
    pub fn new(options: AuthOptions) -> Self {
        if options.checker.is_none() {
            error!("Auth layer built without an access token checker; every request will be rejected");
        }
        Self {
            options: Arc::new(options),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            options: Arc::clone(&self.options),
        }
    }
}

/// Auth service wrapper
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    inner: S,
    options: Arc<AuthOptions>,
}

/// What a request carries into the handler.
struct Admitted<B> {
    request: http::Request<B>,
    viewer: Option<Viewer>,
    operator: Option<OperatorMetadata>,
}

impl<S, B> Service<http::Request<B>> for AuthService<S>
where
    S: Service<http::Request<B>> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<EdgeError> + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = EdgeError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let options = Arc::clone(&self.options);
        // Call the instance that was polled ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let admitted = match admit(&options, req).await {
                Ok(admitted) => admitted,
                Err(e) => {
                    record_decision(&options, "rejected");
                    return Err(e);
                }
            };

            let call = inner.call(admitted.request);
            let with_operator = async move {
                match admitted.operator {
                    Some(op) => operator::scope(op, call).await,
                    None => call.await,
                }
            };
            let result = match admitted.viewer {
                Some(viewer) => viewer.scope(with_operator).await,
                None => with_operator.await,
            };
            result.map_err(Into::into)
        })
    }
}

fn record_decision(options: &AuthOptions, outcome: &str) {
    if let Some(metrics) = &options.metrics {
        metrics.record_auth_decision(outcome);
    }
}

async fn admit<B>(options: &AuthOptions, mut req: http::Request<B>) -> Result<Admitted<B>, EdgeError> {
    let Some(route) = req.extensions().get::<RouteInfo>().cloned() else {
        error!("Auth layer invoked without route information");
        return Err(EdgeError::WrongContext);
    };

    if options.is_whitelisted(&route.operation) {
        debug!(operation = %route.operation, "Whitelisted operation, skipping token check");
        record_decision(options, "whitelisted");
        return Ok(Admitted {
            request: req,
            viewer: None,
            operator: None,
        });
    }

    let token = bearer_token(req.headers())
        .ok_or(EdgeError::MissingBearerToken)?
        .to_string();

    let Some(checker) = &options.checker else {
        error!(operation = %route.operation, "Access token checker is not configured");
        return Err(EdgeError::AccessTokenCheckerNotConfigured);
    };

    let started = Instant::now();
    let payload = checker.is_valid_access_token(&token, false).await;
    if let Some(metrics) = &options.metrics {
        metrics.record_token_check(payload.is_some(), started.elapsed());
    }
    let Some(payload) = payload else {
        warn!(operation = %route.operation, "Invalid access token");
        return Err(EdgeError::AccessTokenExpired);
    };

    if options.inject_operator_id || options.inject_tenant_id {
        req.extensions_mut().insert(OperatorFields {
            operator_id: options.inject_operator_id.then_some(payload.user_id),
            tenant_id: if options.inject_tenant_id {
                payload.tenant_id
            } else {
                None
            },
        });
    }

    let viewer = options.inject_viewer.then(|| {
        let trace_id = current_trace_id()
            .or_else(|| {
                req.headers()
                    .get(TRACEPARENT_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(trace_id_from_traceparent)
            })
            .unwrap_or_default();
        Viewer::from(
            UserViewer::new(
                u64::from(payload.user_id),
                u64::from(payload.tenant_id()),
                u64::from(payload.org_unit_id()),
                trace_id,
                payload.data_scope(),
            )
            .with_roles(payload.roles.clone()),
        )
    });
    if let Some(viewer) = &viewer {
        req.extensions_mut().insert(viewer.clone());
    }

    let operator = options.inject_metadata.then(|| operator_from_payload(&payload));
    if let Some(op) = &operator {
        if let Err(e) = operator::http::inject_headers(req.headers_mut(), op) {
            error!(error = %e, "Failed to set operator header on request");
        }
        req.extensions_mut().insert(op.clone());
    }

    if options.enable_authz {
        let claims = authz_claims(&route, req.method(), &payload);
        req.extensions_mut().insert(claims);
    }

    req.extensions_mut().insert(payload);
    record_decision(options, "allowed");

    Ok(Admitted {
        request: req,
        viewer,
        operator,
    })
}

fn authz_claims(route: &RouteInfo, method: &http::Method, payload: &UserTokenPayload) -> AuthzClaims {
    let (action, resource) = if route.is_http() {
        let resource = if route.path_template.is_empty() {
            &route.operation
        } else {
            &route.path_template
        };
        (method.as_str().to_string(), resource.clone())
    } else {
        (ANY_ACTION.to_string(), route.operation.clone())
    };
    AuthzClaims {
        subjects: payload.roles.clone(),
        action,
        resource,
    }
}

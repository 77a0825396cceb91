//! Auth Pipeline Unit Tests
//!
//! Tests for auth decisions, their metrics and what reaches the handler.

use std::convert::Infallible;
use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::{Request, Response};
use jsonwebtoken::{EncodingKey, Header};
use prometheus::Registry;
use serde_json::json;
use tower::{Layer, ServiceExt, service_fn};

use cms_edge::auth::context;
use cms_edge::observability::EdgeMetrics;
use cms_edge::token::{ComposedChecker, TokenClaims};
use cms_edge::{AuthLayer, AuthOptions, EdgeError, RouteInfo, Viewer};

const OPERATION: &str = "/admin.service.v1.PostService/List";
const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

fn token(uid: u32) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &json!({"sub": "carol", "uid": uid, "tid": 4, "exp": chrono::Utc::now().timestamp() + 600}),
        &EncodingKey::from_secret(b"unit"),
    )
    .unwrap()
}

/// Accepts tokens whose uid is not 13.
fn options(metrics: &EdgeMetrics) -> AuthOptions {
    let checker = ComposedChecker::new().with_valid(|token: String, _skip| async move {
        let payload = TokenClaims::parse_unverified(&token).ok()?.to_payload().ok()?;
        (payload.user_id != 13).then_some(payload)
    });
    AuthOptions::default()
        .with_checker(Arc::new(checker))
        .with_whitelist(["/admin.service.v1.HealthService/Check"])
        .with_metrics(metrics.clone())
}

fn request(operation: &str, token: Option<String>) -> Request<()> {
    let mut builder = Request::builder().uri("/admin/v1/posts").header("traceparent", TRACEPARENT);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let mut req = builder.body(()).unwrap();
    req.extensions_mut().insert(RouteInfo::grpc(operation));
    req
}

async fn echo_viewer(req: Request<()>) -> Result<Response<Option<Viewer>>, Infallible> {
    assert_eq!(context::viewer(req.extensions()).cloned(), Viewer::current());
    Ok(Response::new(Viewer::current()))
}

#[tokio::test]
async fn test_decisions_are_counted() {
    let metrics = EdgeMetrics::new(&Registry::new()).unwrap();
    let layer = AuthLayer::new(options(&metrics));
    let svc = layer.layer(service_fn(echo_viewer));

    svc.clone().oneshot(request(OPERATION, Some(token(7)))).await.unwrap();
    svc.clone().oneshot(request(OPERATION, Some(token(8)))).await.unwrap();
    svc.clone()
        .oneshot(request("/admin.service.v1.HealthService/Check", None))
        .await
        .unwrap();
    let rejected = svc.clone().oneshot(request(OPERATION, Some(token(13)))).await;
    assert!(matches!(rejected, Err(EdgeError::AccessTokenExpired)));
    let missing = svc.oneshot(request(OPERATION, None)).await;
    assert!(matches!(missing, Err(EdgeError::MissingBearerToken)));

    let decisions = |outcome: &str| metrics.auth_decisions.with_label_values(&[outcome]).get();
    assert!((decisions("allowed") - 2.0).abs() < f64::EPSILON);
    assert!((decisions("whitelisted") - 1.0).abs() < f64::EPSILON);
    assert!((decisions("rejected") - 2.0).abs() < f64::EPSILON);

    let checks = |result: &str| {
        metrics
            .token_check_latency
            .with_label_values(&[result])
            .get_sample_count()
    };
    assert_eq!(checks("valid"), 2);
    assert_eq!(checks("invalid"), 1);
}

#[tokio::test]
async fn test_viewer_takes_trace_id_from_traceparent() {
    let metrics = EdgeMetrics::new(&Registry::new()).unwrap();
    let svc = AuthLayer::new(options(&metrics)).layer(service_fn(echo_viewer));

    let viewer = svc
        .oneshot(request(OPERATION, Some(token(7))))
        .await
        .unwrap()
        .into_body()
        .unwrap();
    assert_eq!(viewer.trace_id(), "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(viewer.user_id(), 7);
    assert_eq!(viewer.tenant_id(), 4);
    assert!(viewer.is_tenant_context());
}

#[tokio::test]
async fn test_viewer_injection_can_be_disabled() {
    let metrics = EdgeMetrics::new(&Registry::new()).unwrap();
    let svc = AuthLayer::new(options(&metrics).with_inject_viewer(false)).layer(service_fn(
        |req: Request<()>| async move {
            // The payload is attached even without a viewer.
            let uid = context::user_id(req.extensions())?;
            Ok::<_, EdgeError>(Response::new((uid, Viewer::current())))
        },
    ));

    let (uid, viewer) = svc
        .oneshot(request(OPERATION, Some(token(7))))
        .await
        .unwrap()
        .into_body();
    assert_eq!(uid, 7);
    assert_eq!(viewer, None);
}

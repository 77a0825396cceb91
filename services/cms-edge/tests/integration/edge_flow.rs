//! Edge Flow Integration Tests
//!
//! Requests pass through the audit layer and the auth layer into a handler,
//! in the order a gateway composes them.

use std::time::Duration;

use bytes::Bytes;
use cms_eventbus::{EventBus, events, handler_fn};
use futures::future::BoxFuture;
use http::header::AUTHORIZATION;
use http::{Method, Request, Response};
use serde_json::json;
use tokio::sync::mpsc;
use tonic::service::Interceptor;
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt, service_fn};

use cms_edge::audit::{AuditLayer, AuditOptions, AuditSigner, verify_record};
use cms_edge::auth::AuthLayer;
use cms_edge::operator::{OperatorInterceptor, grpc};
use cms_edge::proto::{ActionType, DataScope, OperatorMetadata, ScopeType, Status};
use cms_edge::{AuthOptions, EdgeError, RemoteAddr, RouteInfo, Viewer};

use crate::common::{
    LOGIN_OPERATION, USERS_OPERATION, USERS_TEMPLATE, capturing_sink, claims_checker, mint_token,
    next_record, user_claims,
};

/// What the handler observed while serving a request.
#[derive(Debug, Default)]
struct Observed {
    viewer: Option<Viewer>,
    outbound: Option<OperatorMetadata>,
}

type Edge = BoxCloneService<Request<Bytes>, Response<Observed>, EdgeError>;

fn handler(req: Request<Bytes>) -> BoxFuture<'static, Result<Response<Observed>, EdgeError>> {
    Box::pin(async move {
        let route = req.extensions().get::<RouteInfo>().cloned().unwrap_or_default();
        if route.operation == LOGIN_OPERATION {
            let body = String::from_utf8_lossy(req.body()).into_owned();
            if body.contains("wrong") {
                return Err(EdgeError::rejected(401, "INCORRECT_PASSWORD"));
            }
        }

        // Outbound gRPC call made while serving the request.
        let outbound = OperatorInterceptor::current()
            .call(tonic::Request::new(()))
            .ok()
            .and_then(|r| grpc::from_request(&r).ok());

        Ok(Response::new(Observed {
            viewer: Viewer::current(),
            outbound,
        }))
    })
}

fn edge(audit: AuditOptions) -> Edge {
    let auth = AuthOptions::default()
        .with_checker(claims_checker())
        .with_whitelist([LOGIN_OPERATION]);
    BoxCloneService::new(
        ServiceBuilder::new()
            .layer(AuditLayer::new(audit))
            .layer(AuthLayer::new(auth))
            .service(service_fn(handler)),
    )
}

fn request(method: Method, uri: &str, route: RouteInfo, token: Option<&str>, body: &'static str) -> Request<Bytes> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0 Safari/537.36");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let mut req = builder.body(Bytes::from_static(body.as_bytes())).expect("request builds");
    req.extensions_mut().insert(route);
    req.extensions_mut()
        .insert(RemoteAddr("203.0.113.5:50412".to_string()));
    req
}

#[tokio::test]
async fn test_authenticated_request_is_attributed_and_signed() {
    let signer = AuditSigner::ephemeral().expect("key generates");
    let mut capture = capturing_sink();
    let svc = edge(
        AuditOptions::default()
            .with_sink(capture.sink.clone())
            .with_signer(signer.clone()),
    );

    let token = mint_token(&user_claims(3600));
    let response = svc
        .oneshot(request(
            Method::GET,
            "/admin/v1/users/42",
            RouteInfo::http(USERS_OPERATION, USERS_TEMPLATE),
            Some(&token),
            "",
        ))
        .await
        .expect("request succeeds");

    let observed = response.into_body();
    let viewer = observed.viewer.expect("viewer installed");
    assert_eq!(viewer.user_id(), 7);
    assert_eq!(viewer.tenant_id(), 2);
    assert_eq!(viewer.data_scopes(), [ScopeType::Unit]);

    let outbound = observed.outbound.expect("outbound call stamped");
    assert_eq!(outbound.user_id, 7);
    assert_eq!(outbound.tenant_id, 2);
    assert_eq!(outbound.data_scope(), DataScope::UnitOnly);

    let record = next_record(&mut capture.api).await;
    assert!(record.success);
    assert_eq!(record.status_code, 200);
    assert_eq!(record.user_id(), 7);
    assert_eq!(record.tenant_id(), 2);
    assert_eq!(record.username, "alice");
    assert_eq!(record.path, USERS_TEMPLATE);
    assert_eq!(record.ip_address, "203.0.113.5");
    assert!(!record.log_hash().is_empty());
    assert!(verify_record(&record, &signer.public_key()));
}

#[tokio::test]
async fn test_expired_token_is_rejected_and_audited() {
    let mut capture = capturing_sink();
    let svc = edge(AuditOptions::default().with_sink(capture.sink.clone()));

    let token = mint_token(&user_claims(-120));
    let err = svc
        .oneshot(request(
            Method::GET,
            "/admin/v1/users/42",
            RouteInfo::http(USERS_OPERATION, USERS_TEMPLATE),
            Some(&token),
            "",
        ))
        .await
        .expect_err("expired token is rejected");
    assert!(matches!(err, EdgeError::AccessTokenExpired));

    let record = next_record(&mut capture.api).await;
    assert!(!record.success);
    assert_eq!(record.status_code, 401);
    assert!(!record.reason.is_empty());
    // Claims of the rejected token are still read for attribution.
    assert_eq!(record.user_id(), 7);
}

#[tokio::test]
async fn test_failed_login_produces_risk_assessed_record() {
    let mut capture = capturing_sink();
    let svc = edge(AuditOptions::default().with_sink(capture.sink.clone()));

    let err = svc
        .oneshot(request(
            Method::POST,
            "/admin/v1/auth/login",
            RouteInfo::http(LOGIN_OPERATION, "/admin/v1/auth/login"),
            None,
            r#"{"username":"alice","password":"wrong"}"#,
        ))
        .await
        .expect_err("login fails");
    assert!(err.http_status() >= 400);

    let record = next_record(&mut capture.login).await;
    assert_eq!(record.action_type(), ActionType::Login);
    assert_eq!(record.status(), Status::Failed);
    assert_eq!(record.username, "alice");
    assert_eq!(record.user_id(), 0);
    for factor in ["FAILED_LOGIN", "ANONYMOUS_LOGIN", "PASSWORD_FAILURE"] {
        assert!(
            record.risk_factors.iter().any(|f| f == factor),
            "missing {factor} in {:?}",
            record.risk_factors
        );
    }
    assert!((60..=70).contains(&record.risk_score));
    assert_eq!(record.risk_level(), cms_edge::proto::RiskLevel::Medium);

    // The login operation never produces an api record.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(capture.api.try_recv().is_err());
}

#[tokio::test]
async fn test_successful_login_publishes_event() {
    let capture = capturing_sink();
    let bus = EventBus::new("audit-test");
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(
        events::USER_LOGGED_IN,
        handler_fn(move |event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
                Ok(())
            }
        }),
    )
    .expect("bus open");

    let svc = edge(
        AuditOptions::default()
            .with_sink(capture.sink.clone())
            .with_events(bus),
    );
    svc.oneshot(request(
        Method::POST,
        "/admin/v1/auth/login",
        RouteInfo::http(LOGIN_OPERATION, "/admin/v1/auth/login"),
        None,
        r#"{"username":"bob","password":"right"}"#,
    ))
    .await
    .expect("login succeeds");

    let event = next_record(&mut rx).await;
    assert_eq!(event.event_type, events::USER_LOGGED_IN);
    assert_eq!(event.data["username"], json!("bob"));
    assert_eq!(event.data["ip_address"], json!("203.0.113.5"));
}

//! Audit Emission Unit Tests
//!
//! Tests for records flowing from the auditor through a queued sink.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use parking_lot::Mutex;
use prometheus::Registry;
use tower::{ServiceBuilder, ServiceExt, service_fn};

use cms_edge::audit::{
    AuditLayer, AuditSink, Auditor, GeoResolver, Outcome, QueuedAuditSink, RequestFacts,
    compute_hash, verify_record,
};
use cms_edge::observability::EdgeMetrics;
use cms_edge::proto::{ApiAuditLog, GeoLocation, LoginAuditLog};
use cms_edge::{AuditOptions, RemoteAddr, RouteInfo};

struct Offices;

#[async_trait]
impl GeoResolver for Offices {
    async fn lookup(&self, ip: &str) -> Option<GeoLocation> {
        (ip == "198.51.100.7").then(|| GeoLocation {
            country_code: "PT".into(),
            city: "Lisbon".into(),
            ..Default::default()
        })
    }
}

#[derive(Default)]
struct Store {
    api: Mutex<Vec<ApiAuditLog>>,
    fail_login: bool,
}

#[async_trait]
impl AuditSink for Store {
    async fn write_api(&self, record: ApiAuditLog) -> anyhow::Result<()> {
        self.api.lock().push(record);
        Ok(())
    }

    async fn write_login(&self, _record: LoginAuditLog) -> anyhow::Result<()> {
        if self.fail_login {
            anyhow::bail!("login store down");
        }
        Ok(())
    }
}

fn request(ip: &str, route: RouteInfo) -> Request<Bytes> {
    let mut req = Request::builder()
        .method("DELETE")
        .uri("/admin/v1/posts/9?force=true")
        .header("x-request-id", "req-1")
        .body(Bytes::new())
        .unwrap();
    req.extensions_mut().insert(route);
    req.extensions_mut().insert(RemoteAddr(format!("{ip}:443")));
    req
}

fn facts(ip: &str, route: RouteInfo) -> RequestFacts {
    RequestFacts::from_request(&request(ip, route))
}

#[tokio::test]
async fn test_queued_records_carry_geo_and_hash() {
    let store = Arc::new(Store::default());
    let queue = QueuedAuditSink::new(store.clone(), 16, None);
    let metrics = EdgeMetrics::new(&Registry::new()).unwrap();
    let auditor = Auditor::new(
        AuditOptions::default()
            .with_sink(Arc::new(queue.clone()))
            .with_geo(Arc::new(Offices))
            .with_metrics(metrics.clone()),
    );
    let public_key = auditor.signer().unwrap().public_key();

    let route = RouteInfo::http("/admin.service.v1.PostService/Delete", "/admin/v1/posts/{id}");
    auditor
        .emit(facts("198.51.100.7", route.clone()), Outcome::from_status(204), Duration::from_millis(12))
        .await;
    auditor
        .emit(facts("192.0.2.1", route), Outcome::from_status(500), Duration::from_millis(3))
        .await;
    queue.close().await;

    let records = store.api.lock().clone();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.http_method, "DELETE");
    assert_eq!(first.request_id, "req-1");
    assert_eq!(first.latency_ms, 12);
    assert!(first.success);
    let geo = first.geo_location.as_ref().unwrap();
    assert_eq!(geo.city, "Lisbon");
    assert_eq!(first.log_hash(), compute_hash(first));
    assert!(verify_record(first, &public_key));

    let second = &records[1];
    assert!(!second.success);
    assert_eq!(second.geo_location.as_ref().unwrap(), &GeoLocation::default());

    let written = |result: &str| metrics.audit_records.with_label_values(&["api", result]).get();
    assert!((written("success") - 2.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_sink_failures_are_counted() {
    let store = Arc::new(Store {
        fail_login: true,
        ..Default::default()
    });
    let metrics = EdgeMetrics::new(&Registry::new()).unwrap();
    let options = AuditOptions::default()
        .with_sink(store)
        .with_metrics(metrics.clone());
    let logout = options.logout_operation.clone();
    let auditor = Auditor::new(options);

    auditor
        .emit(facts("192.0.2.1", RouteInfo::grpc(logout)), Outcome::from_status(200), Duration::ZERO)
        .await;

    let login_errors = metrics.audit_records.with_label_values(&["login", "error"]).get();
    assert!((login_errors - 1.0).abs() < f64::EPSILON);
    let api_ok = metrics.audit_records.with_label_values(&["api", "success"]).get();
    assert!((api_ok - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_layer_records_verify_with_the_startup_key() {
    let store = Arc::new(Store::default());
    let auditor = Auditor::new(AuditOptions::default().with_sink(store.clone()));
    let signer = auditor.signer().cloned().unwrap();
    assert!(signer.is_ephemeral());

    let svc = ServiceBuilder::new()
        .layer(AuditLayer::from_auditor(auditor))
        .service(service_fn(|_req: Request<Bytes>| async {
            Ok::<_, Infallible>(Response::new(()))
        }));
    let route = RouteInfo::http("/admin.service.v1.PostService/Delete", "/admin/v1/posts/{id}");
    svc.oneshot(request("198.51.100.7", route)).await.unwrap();

    // Emission runs detached from the response.
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.api.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let record = store.api.lock()[0].clone();
    assert!(record.signature.is_some());
    assert_eq!(record.log_hash(), compute_hash(&record));
    assert!(verify_record(&record, &signer.public_key()));
}

//! Operator Envelope Unit Tests
//!
//! Tests for the `x-md-operator` carriers and outbound stamping.

use http::HeaderMap;
use tonic::metadata::MetadataMap;
use tonic::service::Interceptor;

use cms_edge::operator::{
    self, MetadataError, OPERATOR_HEADER, OperatorInterceptor, grpc, http as carrier,
    service_operator, system_operator, user_operator,
};
use cms_edge::proto::{DataScope, OperatorKind};

// ============================================================================
// Carrier Tests
// ============================================================================

#[test]
fn test_http_and_grpc_carry_the_same_value() {
    let op = user_operator(7, 2, 3, DataScope::UnitAndChild);

    let mut headers = HeaderMap::new();
    carrier::inject_headers(&mut headers, &op).unwrap();
    let mut metadata = MetadataMap::new();
    grpc::inject_metadata(&mut metadata, &op).unwrap();

    let from_http = headers.get(OPERATOR_HEADER).unwrap().to_str().unwrap();
    let from_grpc = metadata.get(OPERATOR_HEADER).unwrap().to_str().unwrap();
    assert_eq!(from_http, from_grpc);
    assert_eq!(from_http, operator::encode(&op));
}

#[test]
fn test_value_is_url_safe_without_padding() {
    for op in [system_operator(1), service_operator(u64::MAX, 9), user_operator(1, 1, 1, DataScope::SelfOnly)] {
        let value = operator::encode(&op);
        assert!(!value.contains('='));
        assert!(!value.contains('+'));
        assert!(!value.contains('/'));
        assert_eq!(operator::decode(&value).unwrap(), op);
    }
}

#[test]
fn test_missing_and_malformed_envelopes() {
    assert_eq!(carrier::from_headers(&HeaderMap::new()), Err(MetadataError::NoMetadata));

    let mut headers = HeaderMap::new();
    headers.insert("x-other", "1".parse().unwrap());
    assert_eq!(carrier::from_headers(&headers), Err(MetadataError::NoOperatorHeader));

    headers.insert(OPERATOR_HEADER, "!!!".parse().unwrap());
    assert!(matches!(
        carrier::from_headers(&headers),
        Err(MetadataError::InvalidOperator { .. })
    ));

    assert_eq!(operator::decode(""), Err(MetadataError::EmptyOperatorString));
}

#[test]
fn test_system_operator_has_full_scope() {
    let op = system_operator(5);
    assert_eq!(op.kind(), OperatorKind::System);
    assert_eq!(op.data_scope(), DataScope::All);
    assert_eq!(op.tenant_id, 5);
    assert_eq!(op.user_id, 0);
}

// ============================================================================
// Interceptor Tests
// ============================================================================

#[test]
fn test_interceptor_outside_request_sends_nothing() {
    let request = OperatorInterceptor::current()
        .call(tonic::Request::new(()))
        .unwrap();
    assert!(request.metadata().get(OPERATOR_HEADER).is_none());
}

#[test]
fn test_fixed_interceptor_stamps_service_identity() {
    let op = service_operator(900, 1);
    let request = OperatorInterceptor::fixed(op.clone())
        .call(tonic::Request::new(()))
        .unwrap();
    assert_eq!(grpc::from_request(&request).unwrap(), op);
}

#[tokio::test]
async fn test_interceptor_follows_current_scope() {
    let op = user_operator(7, 2, 0, DataScope::All);
    let stamped = operator::scope(op.clone(), async {
        OperatorInterceptor::current()
            .call(tonic::Request::new(()))
            .map(|r| grpc::from_request(&r))
    })
    .await;
    assert_eq!(stamped.unwrap().unwrap(), op);
    assert_eq!(operator::current(), None);
}

//! Broker Flow Integration Tests
//!
//! A request authenticated at the edge publishes a message; the consumer
//! handles it under the same identity.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Request, Response};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tower::{ServiceBuilder, ServiceExt, service_fn};

use cms_edge::broker::{
    BrokerMessage, HEADER_SYSTEM, HEADER_USER_ID, MessageHandler, Publisher, ViewerPublisher,
    ViewerSubscriber,
};
use cms_edge::proto::ScopeType;
use cms_edge::{AuthLayer, AuthOptions, EdgeError, RouteInfo, Viewer};

use crate::common::{USERS_OPERATION, USERS_TEMPLATE, claims_checker, mint_token, next_record, user_claims};

/// In-memory broker: publishing sends on a channel.
struct ChannelBroker {
    tx: UnboundedSender<(String, BrokerMessage)>,
}

#[async_trait]
impl Publisher for ChannelBroker {
    async fn publish(&self, topic: &str, message: BrokerMessage) -> anyhow::Result<()> {
        self.tx
            .send((topic.to_string(), message))
            .map_err(|_| anyhow::anyhow!("broker closed"))
    }
}

#[derive(Default)]
struct SeenViewers(Mutex<Vec<Option<Viewer>>>);

#[async_trait]
impl MessageHandler for &SeenViewers {
    async fn handle(&self, _topic: &str, _message: BrokerMessage) -> anyhow::Result<()> {
        self.0.lock().push(Viewer::current());
        Ok(())
    }
}

#[tokio::test]
async fn test_consumer_runs_as_the_publishing_user() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let publisher = Arc::new(ViewerPublisher::new(ChannelBroker { tx }));

    let svc = ServiceBuilder::new()
        .layer(AuthLayer::new(
            AuthOptions::default().with_checker(claims_checker()),
        ))
        .service(service_fn(move |_req: Request<Bytes>| {
            let publisher = Arc::clone(&publisher);
            async move {
                publisher
                    .publish("posts.created", BrokerMessage::new(r#"{"post_id":1}"#))
                    .await
                    .map_err(EdgeError::Internal)?;
                Ok::<_, EdgeError>(Response::new(()))
            }
        }));

    let mut req = Request::builder()
        .uri("/admin/v1/users/1")
        .header(AUTHORIZATION, format!("Bearer {}", mint_token(&user_claims(3600))))
        .body(Bytes::new())
        .expect("request builds");
    req.extensions_mut()
        .insert(RouteInfo::http(USERS_OPERATION, USERS_TEMPLATE));
    svc.oneshot(req).await.expect("request succeeds");

    let (topic, message) = next_record(&mut rx).await;
    assert_eq!(topic, "posts.created");
    assert_eq!(message.header(HEADER_USER_ID), Some("7"));
    assert_eq!(message.body, Bytes::from_static(br#"{"post_id":1}"#));

    let seen = Arc::new(SeenViewers::default());
    ViewerSubscriber::new(&*seen)
        .handle(&topic, message)
        .await
        .expect("handled");

    let viewer = seen.0.lock().pop().flatten().expect("viewer restored");
    assert_eq!(viewer.user_id(), 7);
    assert_eq!(viewer.tenant_id(), 2);
    assert_eq!(viewer.org_unit_id(), 3);
    assert_eq!(viewer.data_scopes(), [ScopeType::Unit]);
    assert_eq!(viewer.roles(), ["editor"]);
}

#[tokio::test]
async fn test_system_job_publishes_as_system() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let publisher = ViewerPublisher::new(ChannelBroker { tx });

    Viewer::System
        .scope(publisher.publish("reindex", BrokerMessage::new("{}")))
        .await
        .expect("published");

    let (_, message) = next_record(&mut rx).await;
    assert_eq!(message.header(HEADER_SYSTEM), Some("true"));
    assert_eq!(message.header(HEADER_USER_ID), None);

    let seen = Arc::new(SeenViewers::default());
    ViewerSubscriber::new(&*seen)
        .handle("reindex", message)
        .await
        .expect("handled");
    assert_eq!(*seen.0.lock(), vec![Some(Viewer::System)]);
}

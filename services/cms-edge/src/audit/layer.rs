//! Audit Tower Layer
//!
//! Times the inner service and emits the request's audit record once the
//! response is known.

use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::future::BoxFuture;
use tower::{Layer, Service};

use crate::audit::builder::{Auditor, RequestFacts};
use crate::audit::options::AuditOptions;
use crate::audit::request::Outcome;
use crate::error::EdgeError;

/// Audit layer for Tower
#[derive(Debug, Clone)]
pub struct AuditLayer {
    auditor: Auditor,
}

impl AuditLayer {
    /// Creates a new audit layer
    #[must_use]
    pub fn new(options: AuditOptions) -> Self {
        Self {
            auditor: Auditor::new(options),
        }
    }

    /// Layer sharing an existing auditor
    #[must_use]
    pub const fn from_auditor(auditor: Auditor) -> Self {
        Self { auditor }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            auditor: self.auditor.clone(),
        }
    }
}

/// Audit service wrapper
#[derive(Debug, Clone)]
pub struct AuditService<S> {
    inner: S,
    auditor: Auditor,
}

impl<S, B> Service<http::Request<Bytes>> for AuditService<S>
where
    S: Service<http::Request<Bytes>, Response = http::Response<B>> + Clone + Send + 'static,
    S::Error: Into<EdgeError> + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = http::Response<B>;
    type Error = EdgeError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: http::Request<Bytes>) -> Self::Future {
        let facts = RequestFacts::from_request(&req);
        let auditor = self.auditor.clone();
        // Call the instance that was polled ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let start = Instant::now();
            let result: Result<http::Response<B>, EdgeError> = inner.call(req).await.map_err(Into::into);
            let latency = start.elapsed();

            let outcome = match &result {
                Ok(response) => Outcome::from_status(response.status().as_u16()),
                Err(e) => Outcome::from_error(e),
            };

            // Runs on its own task: a client disconnect must not drop the record.
            tokio::spawn(async move {
                auditor.emit(facts, outcome, latency).await;
            });

            result
        })
    }
}

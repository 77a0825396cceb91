//! Event handlers and handler combinators.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::error;

use crate::error::EventResult;
use crate::event::Event;

/// Something that reacts to events.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one event.
    async fn handle(&self, event: &Event) -> EventResult;
}

/// Reference-counted handler, the unit the bus stores and compares.
pub type SharedHandler = Arc<dyn Handler>;

/// Adapter turning an async closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = EventResult> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> EventResult {
        (self.f)(event.clone()).await
    }
}

/// Build a shared handler from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EventResult> + Send + 'static,
{
    Arc::new(FnHandler::new(f))
}

/// Runs the wrapped handler on a detached task and returns immediately.
///
/// The task does not inherit anything from the publisher, so cancelling
/// the publisher never aborts delivery. Failures are logged.
#[derive(Clone)]
pub struct AsyncHandler {
    inner: SharedHandler,
}

impl AsyncHandler {
    /// Wrap a handler.
    #[must_use]
    pub fn new(inner: SharedHandler) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Handler for AsyncHandler {
    async fn handle(&self, event: &Event) -> EventResult {
        let inner = Arc::clone(&self.inner);
        let event = event.clone();
        tokio::spawn(async move {
            if let Err(e) = inner.handle(&event).await {
                error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "Async event handler failed"
                );
            }
        });
        Ok(())
    }
}

/// Runs handlers in sequence, stopping at the first error.
#[derive(Clone, Default)]
pub struct ChainHandler {
    handlers: Vec<SharedHandler>,
}

impl ChainHandler {
    /// Create a chain from handlers in execution order.
    #[must_use]
    pub fn new(handlers: Vec<SharedHandler>) -> Self {
        Self { handlers }
    }
}

#[async_trait]
impl Handler for ChainHandler {
    async fn handle(&self, event: &Event) -> EventResult {
        for handler in &self.handlers {
            handler.handle(event).await?;
        }
        Ok(())
    }
}

type Predicate = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Invokes the wrapped handler only when the predicate accepts the event.
#[derive(Clone)]
pub struct FilterHandler {
    filter: Predicate,
    inner: SharedHandler,
}

impl FilterHandler {
    /// Create a filtered handler.
    pub fn new<P>(filter: P, inner: SharedHandler) -> Self
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Arc::new(filter),
            inner,
        }
    }
}

#[async_trait]
impl Handler for FilterHandler {
    async fn handle(&self, event: &Event) -> EventResult {
        if (self.filter)(event) {
            self.inner.handle(event).await
        } else {
            Ok(())
        }
    }
}

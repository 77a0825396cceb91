//! Handler middleware.
//!
//! A middleware is a function from handler to handler. [`chain`] composes
//! several so that the first one listed ends up outermost.

use async_trait::async_trait;
use futures::FutureExt;
use prometheus::{HistogramOpts, HistogramVec, Registry};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::error::{EventError, EventResult, PanicError, TimeoutError};
use crate::event::Event;
use crate::handler::{Handler, SharedHandler};

/// Handler-to-handler transformation.
pub type Middleware = Arc<dyn Fn(SharedHandler) -> SharedHandler + Send + Sync>;

/// Compose middlewares right to left: `chain([a, b])(h) == a(b(h))`.
#[must_use]
pub fn chain(middlewares: Vec<Middleware>) -> Middleware {
    Arc::new(move |handler| {
        middlewares
            .iter()
            .rev()
            .fold(handler, |wrapped, middleware| middleware(wrapped))
    })
}

/// Log entry at info, failures at error.
#[must_use]
pub fn logging() -> Middleware {
    Arc::new(|inner| Arc::new(Logging { inner }) as SharedHandler)
}

/// Trap panics and surface them as [`PanicError`].
#[must_use]
pub fn recovery() -> Middleware {
    Arc::new(|inner| Arc::new(Recovery { inner }) as SharedHandler)
}

/// Report [`TimeoutError`] when the handler exceeds `timeout`.
///
/// The handler runs on its own task and is not cancelled on timeout.
#[must_use]
pub fn timeout(timeout: Duration) -> Middleware {
    Arc::new(move |inner| Arc::new(Timeout { inner, timeout }) as SharedHandler)
}

/// Retry failures up to `max_retries` times, waiting `delay * attempt`
/// between attempts.
#[must_use]
pub fn retry(max_retries: u32, delay: Duration) -> Middleware {
    Arc::new(move |inner| {
        Arc::new(Retry {
            inner,
            max_retries,
            delay,
        }) as SharedHandler
    })
}

/// Record handler wall-clock duration, optionally into a histogram
/// labelled by `event_type` and `success`.
#[must_use]
pub fn metrics(histogram: Option<HistogramVec>) -> Middleware {
    Arc::new(move |inner| {
        Arc::new(Metrics {
            inner,
            histogram: histogram.clone(),
        }) as SharedHandler
    })
}

/// Create and register the handler duration histogram used by [`metrics`].
///
/// # Errors
///
/// Returns an error if registration fails, e.g. on a duplicate name.
pub fn register_handler_histogram(registry: &Registry) -> prometheus::Result<HistogramVec> {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "handler_duration_seconds",
            "Event handler execution time in seconds",
        )
        .namespace("cms_eventbus")
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["event_type", "success"],
    )?;
    registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

struct Logging {
    inner: SharedHandler,
}

#[async_trait]
impl Handler for Logging {
    async fn handle(&self, event: &Event) -> EventResult {
        info!(
            event_type = %event.event_type,
            event_id = %event.id,
            source = %event.source,
            "Handling event"
        );
        let result = self.inner.handle(event).await;
        match &result {
            Ok(()) => debug!(event_id = %event.id, "Successfully handled event"),
            Err(e) => error!(event_id = %event.id, error = %e, "Error handling event"),
        }
        result
    }
}

struct Recovery {
    inner: SharedHandler,
}

#[async_trait]
impl Handler for Recovery {
    async fn handle(&self, event: &Event) -> EventResult {
        match AssertUnwindSafe(self.inner.handle(event)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let panic = PanicError::from_payload(payload.as_ref());
                error!(
                    event_type = %event.event_type,
                    panic = %panic.value,
                    "Panic recovered in event handler"
                );
                Err(panic.into())
            }
        }
    }
}

struct Timeout {
    inner: SharedHandler,
    timeout: Duration,
}

#[async_trait]
impl Handler for Timeout {
    async fn handle(&self, event: &Event) -> EventResult {
        let inner = Arc::clone(&self.inner);
        let owned = event.clone();
        let task = tokio::spawn(async move { inner.handle(&owned).await });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(PanicError::from_payload(join_err.into_panic().as_ref()).into())
            }
            Ok(Err(join_err)) => Err(EventError::handler(join_err)),
            // Dropping the JoinHandle detaches the task; it keeps running.
            Err(_) => Err(TimeoutError {
                event_id: event.id.clone(),
                event_type: event.event_type.clone(),
                timeout: self.timeout,
            }
            .into()),
        }
    }
}

struct Retry {
    inner: SharedHandler,
    max_retries: u32,
    delay: Duration,
}

#[async_trait]
impl Handler for Retry {
    async fn handle(&self, event: &Event) -> EventResult {
        let mut attempt = 0;
        loop {
            match self.inner.handle(event).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    debug!(
                        event_id = %event.id,
                        attempt,
                        error = %e,
                        "Retrying event handler"
                    );
                    tokio::time::sleep(self.delay * attempt).await;
                }
            }
        }
    }
}

struct Metrics {
    inner: SharedHandler,
    histogram: Option<HistogramVec>,
}

#[async_trait]
impl Handler for Metrics {
    async fn handle(&self, event: &Event) -> EventResult {
        let start = Instant::now();
        let result = self.inner.handle(event).await;
        let elapsed = start.elapsed();
        let success = result.is_ok();

        if let Some(histogram) = &self.histogram {
            histogram
                .with_label_values(&[event.event_type.as_str(), if success { "true" } else { "false" }])
                .observe(elapsed.as_secs_f64());
        }
        info!(
            event_type = %event.event_type,
            duration = ?elapsed,
            success,
            "Event handling metrics"
        );
        result
    }
}

//! Topic-keyed event bus.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{EventError, EventResult};
use crate::event::Event;
use crate::handler::{AsyncHandler, SharedHandler};

/// Ceiling on a detached [`EventBus::publish_async`] delivery.
pub const ASYNC_PUBLISH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Default)]
struct BusState {
    handlers: HashMap<String, Vec<SharedHandler>>,
    once: HashMap<String, Vec<SharedHandler>>,
    closed: bool,
}

struct Inner {
    name: String,
    state: RwLock<BusState>,
}

/// In-process publish/subscribe bus.
///
/// Cloning is cheap and every clone refers to the same bus. Handler lists
/// are snapshotted under the read lock and invoked after it is released,
/// so handlers may subscribe or publish re-entrantly.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new("default")
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.inner.name)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create an empty bus. The name only appears in logs.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: RwLock::new(BusState::default()),
            }),
        }
    }

    /// Bus name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.read().closed
    }

    /// Append a handler for `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::BusClosed`] after the bus was closed.
    pub fn subscribe(&self, event_type: impl Into<String>, handler: SharedHandler) -> EventResult {
        let mut state = self.inner.state.write();
        if state.closed {
            return Err(EventError::BusClosed);
        }
        state.handlers.entry(event_type.into()).or_default().push(handler);
        Ok(())
    }

    /// Append a handler that runs on a detached task.
    ///
    /// The wrapping happens here, once, not on every publish.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::BusClosed`] after the bus was closed.
    pub fn subscribe_async(
        &self,
        event_type: impl Into<String>,
        handler: SharedHandler,
    ) -> EventResult<SharedHandler> {
        let wrapped: SharedHandler = Arc::new(AsyncHandler::new(handler));
        self.subscribe(event_type, Arc::clone(&wrapped))?;
        Ok(wrapped)
    }

    /// Register a handler consumed by the next delivery of `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::BusClosed`] after the bus was closed.
    pub fn subscribe_once(&self, event_type: impl Into<String>, handler: SharedHandler) -> EventResult {
        let mut state = self.inner.state.write();
        if state.closed {
            return Err(EventError::BusClosed);
        }
        state.once.entry(event_type.into()).or_default().push(handler);
        Ok(())
    }

    /// Remove a handler by identity, looking at regular then once-handlers.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::HandlerNotFound`] when the handler is not
    /// registered for `event_type`.
    pub fn unsubscribe(&self, event_type: &str, handler: &SharedHandler) -> EventResult {
        let mut state = self.inner.state.write();
        let BusState { handlers, once, .. } = &mut *state;
        for table in [handlers, once] {
            if let Some(list) = table.get_mut(event_type) {
                if let Some(pos) = list.iter().position(|h| same_handler(h, handler)) {
                    list.remove(pos);
                    if list.is_empty() {
                        table.remove(event_type);
                    }
                    return Ok(());
                }
            }
        }
        Err(EventError::handler_not_found(event_type))
    }

    /// Deliver `event` to every handler of its type on the caller's task.
    ///
    /// Regular handlers run first in subscription order, then once-handlers.
    /// A failing handler is logged and delivery continues. Once-handlers are
    /// taken out of the table before they run, so concurrent publishers can
    /// never both fire the same one.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::BusClosed`] after the bus was closed. Handler
    /// errors are never returned.
    pub async fn publish(&self, event: &Event) -> EventResult {
        let (regular, has_once) = {
            let state = self.inner.state.read();
            if state.closed {
                warn!(
                    bus = %self.inner.name,
                    event_type = %event.event_type,
                    "Event bus is closed, cannot publish event"
                );
                return Err(EventError::BusClosed);
            }
            (
                state.handlers.get(&event.event_type).cloned().unwrap_or_default(),
                state.once.contains_key(&event.event_type),
            )
        };

        let once = if has_once {
            self.inner
                .state
                .write()
                .once
                .remove(&event.event_type)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        for handler in &regular {
            if let Err(e) = handler.handle(event).await {
                error!(
                    bus = %self.inner.name,
                    event_type = %event.event_type,
                    event_id = %event.id,
                    error = %e,
                    "Handler error"
                );
            }
        }

        for handler in &once {
            if let Err(e) = handler.handle(event).await {
                error!(
                    bus = %self.inner.name,
                    event_type = %event.event_type,
                    event_id = %event.id,
                    error = %e,
                    "Once handler error"
                );
            }
        }

        Ok(())
    }

    /// Publish on a detached task bounded by [`ASYNC_PUBLISH_TIMEOUT`].
    ///
    /// Returns immediately. The delivery does not depend on the caller's
    /// task, so dropping or cancelling the caller never aborts it.
    pub fn publish_async(&self, event: Event) {
        let bus = self.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(ASYNC_PUBLISH_TIMEOUT, bus.publish(&event)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    bus = %bus.inner.name,
                    event_type = %event.event_type,
                    error = %e,
                    "Async publish error"
                ),
                Err(_) => error!(
                    bus = %bus.inner.name,
                    event_type = %event.event_type,
                    timeout = ?ASYNC_PUBLISH_TIMEOUT,
                    "Async publish timed out"
                ),
            }
        });
    }

    /// Close the bus and drop every handler.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadyClosed`] on the second call.
    pub fn close(&self) -> EventResult {
        let mut state = self.inner.state.write();
        if state.closed {
            return Err(EventError::AlreadyClosed);
        }
        state.closed = true;
        state.handlers.clear();
        state.once.clear();
        drop(state);
        info!(bus = %self.inner.name, "Event bus closed");
        Ok(())
    }

    /// Regular plus once-handlers registered for `event_type`.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        let state = self.inner.state.read();
        state.handlers.get(event_type).map_or(0, Vec::len)
            + state.once.get(event_type).map_or(0, Vec::len)
    }

    /// Event types with at least one handler, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        let state = self.inner.state.read();
        let mut types: Vec<String> = state
            .handlers
            .iter()
            .chain(state.once.iter())
            .filter(|(_, list)| !list.is_empty())
            .map(|(t, _)| t.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }
}

fn same_handler(a: &SharedHandler, b: &SharedHandler) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

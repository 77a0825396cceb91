//! Event bus error types using thiserror 2.0.

use std::time::Duration;
use thiserror::Error;

/// Event bus errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EventError {
    /// Subscribe or publish after the bus was closed
    #[error("event bus is closed")]
    BusClosed,

    /// Close called on a bus that is already closed
    #[error("event bus already closed")]
    AlreadyClosed,

    /// Unsubscribe could not find the handler
    #[error("handler not found for event type: {event_type}")]
    HandlerNotFound {
        /// Event type that was searched
        event_type: String,
    },

    /// A handler panicked and the recovery middleware trapped it
    #[error(transparent)]
    Panic(#[from] PanicError),

    /// A handler exceeded the timeout middleware's deadline
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Event payload could not be converted
    #[error("event data conversion failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error returned by handler code
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl EventError {
    /// Create a handler-not-found error.
    #[must_use]
    pub fn handler_not_found(event_type: impl Into<String>) -> Self {
        Self::HandlerNotFound {
            event_type: event_type.into(),
        }
    }

    /// Wrap a plain message as a handler failure.
    #[must_use]
    pub fn handler(msg: impl std::fmt::Display) -> Self {
        Self::Handler(anyhow::anyhow!("{msg}"))
    }

    /// Check if retrying the handler could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Handler(_))
    }
}

/// Result type for event bus operations.
pub type EventResult<T = ()> = Result<T, EventError>;

/// A panic trapped while handling an event.
#[derive(Error, Debug, Clone)]
#[error("panic in event handler")]
pub struct PanicError {
    /// Panic payload rendered as text
    pub value: String,
}

impl PanicError {
    /// Build from a raw panic payload.
    #[must_use]
    pub fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let value = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self { value }
    }
}

/// A handler that ran past its deadline.
///
/// The handler itself keeps running; only the caller stops waiting.
#[derive(Error, Debug, Clone)]
#[error("event handling timeout")]
pub struct TimeoutError {
    /// Event id being handled
    pub event_id: String,
    /// Event type being handled
    pub event_type: String,
    /// Deadline that elapsed
    pub timeout: Duration,
}

//! In-process event bus.
//!
//! Topic-keyed publish/subscribe for a single process:
//! - Ordered synchronous delivery with per-handler failure isolation
//! - Async handlers detached from the publisher's task
//! - Once-handlers that fire at most once, even under concurrent publishes
//! - Composable handler middleware (logging, recovery, timeout, retry, metrics)
//! - A manager holding the global bus plus lazily created named buses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod error;
pub mod event;
pub mod events;
pub mod handler;
pub mod manager;
pub mod middleware;

pub use bus::{EventBus, ASYNC_PUBLISH_TIMEOUT};
pub use error::{EventError, EventResult, PanicError, TimeoutError};
pub use event::Event;
pub use handler::{
    handler_fn, AsyncHandler, ChainHandler, FilterHandler, FnHandler, Handler, SharedHandler,
};
pub use manager::{global_manager, EventBusManager, ManagerStats};
pub use middleware::{chain, Middleware};

//! Audit record sinks.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::observability::EdgeMetrics;
use crate::proto::{ApiAuditLog, LoginAuditLog};
use crate::viewer::Viewer;

/// Default bound of a [`QueuedAuditSink`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Destination for finished records.
///
/// Called after the response is produced, inside a system viewer scope.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist an API record.
    async fn write_api(&self, record: ApiAuditLog) -> anyhow::Result<()>;

    /// Persist a login or logout record.
    async fn write_login(&self, record: LoginAuditLog) -> anyhow::Result<()>;
}

/// Shared sink.
pub type SharedAuditSink = Arc<dyn AuditSink>;

/// Writes records to the log at info level, target `audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn write_api(&self, record: ApiAuditLog) -> anyhow::Result<()> {
        info!(
            target: "audit",
            kind = "api",
            operation = %record.api_operation,
            method = %record.http_method,
            path = %record.path,
            user_id = record.user_id(),
            tenant_id = record.tenant_id(),
            ip = %record.ip_address,
            status = record.status_code,
            success = record.success,
            latency_ms = record.latency_ms,
            log_hash = %record.log_hash(),
            "API audit record"
        );
        Ok(())
    }

    async fn write_login(&self, record: LoginAuditLog) -> anyhow::Result<()> {
        info!(
            target: "audit",
            kind = "login",
            action = ?record.action_type(),
            status = ?record.status(),
            username = %record.username,
            user_id = record.user_id(),
            ip = %record.ip_address,
            risk_score = record.risk_score,
            risk_level = ?record.risk_level(),
            risk_factors = ?record.risk_factors,
            log_hash = %record.log_hash(),
            "Login audit record"
        );
        Ok(())
    }
}

#[derive(Debug)]
enum Entry {
    Api(ApiAuditLog),
    Login(LoginAuditLog),
}

struct Shared {
    queue: Mutex<VecDeque<Entry>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
    metrics: Option<EdgeMetrics>,
    drainer: Mutex<Option<JoinHandle<()>>>,
}

/// Bounded queue in front of a slower sink.
///
/// Writes never wait: when the queue is full the oldest record is dropped.
/// A background task delivers records to the inner sink in order, inside a
/// system viewer scope.
#[derive(Clone)]
pub struct QueuedAuditSink {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for QueuedAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedAuditSink")
            .field("capacity", &self.shared.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl QueuedAuditSink {
    /// Queue in front of `inner`, spawning the delivery task.
    ///
    /// Must be called inside a tokio runtime. A capacity of 0 is raised to 1.
    #[must_use]
    pub fn new(inner: SharedAuditSink, capacity: usize, metrics: Option<EdgeMetrics>) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            metrics,
            drainer: Mutex::new(None),
        });
        let handle = tokio::spawn(drain(Arc::clone(&shared), inner));
        *shared.drainer.lock() = Some(handle);
        Self { shared }
    }

    /// Queue bounded by `AUDIT_QUEUE_CAPACITY`.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn from_config(inner: SharedAuditSink, config: &Config, metrics: Option<EdgeMetrics>) -> Self {
        Self::new(inner, config.audit_queue_capacity, metrics)
    }

    /// Most records held before the oldest is dropped.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Records waiting for delivery.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting records, deliver what is queued, then return.
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.notify.notify_one();
        let handle = self.shared.drainer.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(target: "audit", error = %e, "Audit queue drainer failed");
            }
        }
    }

    fn push(&self, entry: Entry) -> anyhow::Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            anyhow::bail!("audit queue is closed");
        }
        let dropped = {
            let mut queue = self.shared.queue.lock();
            let dropped = if queue.len() >= self.shared.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(entry);
            dropped
        };
        if let Some(dropped) = dropped {
            warn!(target: "audit", record = ?dropped, "Audit queue full, dropped oldest record");
            if let Some(metrics) = &self.shared.metrics {
                metrics.record_audit_drop();
            }
        }
        self.shared.notify.notify_one();
        Ok(())
    }
}

async fn drain(shared: Arc<Shared>, inner: SharedAuditSink) {
    loop {
        let next = shared.queue.lock().pop_front();
        match next {
            Some(Entry::Api(record)) => {
                if let Err(e) = Viewer::System.scope(inner.write_api(record)).await {
                    error!(target: "audit", kind = "api", error = %e, "Failed to write audit record");
                }
            }
            Some(Entry::Login(record)) => {
                if let Err(e) = Viewer::System.scope(inner.write_login(record)).await {
                    error!(target: "audit", kind = "login", error = %e, "Failed to write audit record");
                }
            }
            None if shared.closed.load(Ordering::SeqCst) => break,
            None => shared.notify.notified().await,
        }
    }
}

#[async_trait]
impl AuditSink for QueuedAuditSink {
    async fn write_api(&self, record: ApiAuditLog) -> anyhow::Result<()> {
        self.push(Entry::Api(record))
    }

    async fn write_login(&self, record: LoginAuditLog) -> anyhow::Result<()> {
        self.push(Entry::Login(record))
    }
}

//! Edge pipeline metrics
//!
//! Prometheus counters and histograms for auth decisions, token checks,
//! audit emission and field encryption.

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry};
use std::time::Duration;

const NAMESPACE: &str = "cms_edge";

/// Metrics for the edge pipeline.
#[derive(Clone)]
pub struct EdgeMetrics {
    /// Auth decisions by outcome (`allowed`, `whitelisted`, `rejected`)
    pub auth_decisions: CounterVec,
    /// Remote token-check latency by result
    pub token_check_latency: HistogramVec,
    /// Audit records by kind (`api`, `login`) and result
    pub audit_records: CounterVec,
    /// Audit records dropped by a full queue
    pub audit_queue_drops: IntCounter,
    /// Crypto operations by kind and result
    pub crypto_operations: CounterVec,
}

impl std::fmt::Debug for EdgeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeMetrics").finish_non_exhaustive()
    }
}

impl EdgeMetrics {
    /// Creates and registers the edge metrics
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or is already
    /// registered on `registry`.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let auth_decisions = CounterVec::new(
            Opts::new("auth_decisions_total", "Total auth middleware decisions")
                .namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_decisions.clone()))?;

        let token_check_latency = HistogramVec::new(
            HistogramOpts::new(
                "token_check_duration_seconds",
                "Access token check latency in seconds",
            )
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["result"],
        )?;
        registry.register(Box::new(token_check_latency.clone()))?;

        let audit_records = CounterVec::new(
            Opts::new("audit_records_total", "Total audit records emitted")
                .namespace(NAMESPACE),
            &["kind", "result"],
        )?;
        registry.register(Box::new(audit_records.clone()))?;

        let audit_queue_drops = IntCounter::with_opts(
            Opts::new(
                "audit_queue_drops_total",
                "Audit records dropped because the queue was full",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(audit_queue_drops.clone()))?;

        let crypto_operations = CounterVec::new(
            Opts::new("crypto_operations_total", "Total field-encryption operations")
                .namespace(NAMESPACE),
            &["operation", "result"],
        )?;
        registry.register(Box::new(crypto_operations.clone()))?;

        Ok(Self {
            auth_decisions,
            token_check_latency,
            audit_records,
            audit_queue_drops,
            crypto_operations,
        })
    }

    /// Records an auth decision
    pub fn record_auth_decision(&self, outcome: &str) {
        self.auth_decisions.with_label_values(&[outcome]).inc();
    }

    /// Records a token check
    pub fn record_token_check(&self, valid: bool, elapsed: Duration) {
        self.token_check_latency
            .with_label_values(&[if valid { "valid" } else { "invalid" }])
            .observe(elapsed.as_secs_f64());
    }

    /// Records an audit record emission
    pub fn record_audit(&self, kind: &str, success: bool) {
        self.audit_records
            .with_label_values(&[kind, result_label(success)])
            .inc();
    }

    /// Records a record dropped from the audit queue
    pub fn record_audit_drop(&self) {
        self.audit_queue_drops.inc();
    }

    /// Records a crypto operation
    pub fn record_crypto(&self, operation: &str, success: bool) {
        self.crypto_operations
            .with_label_values(&[operation, result_label(success)])
            .inc();
    }
}

const fn result_label(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

//! Audit pipeline options.

use std::sync::Arc;

use cms_eventbus::EventBus;

use crate::audit::geo::{NoopGeoResolver, SharedGeoResolver};
use crate::audit::signer::{AuditSigner, SignerError};
use crate::audit::sink::SharedAuditSink;
use crate::config::{Config, ConfigError};
use crate::observability::EdgeMetrics;

/// Operation id of the admin login RPC.
pub const DEFAULT_LOGIN_OPERATION: &str = "/admin.service.v1.AuthenticationService/Login";
/// Operation id of the admin logout RPC.
pub const DEFAULT_LOGOUT_OPERATION: &str = "/admin.service.v1.AuthenticationService/Logout";

/// What the audit layer records and where it sends it.
#[derive(Clone)]
pub struct AuditOptions {
    /// Operation that produces a login record instead of an api record
    pub login_operation: String,
    /// Operation that produces a logout record
    pub logout_operation: String,
    /// Record destination; records are built but dropped when unset
    pub sink: Option<SharedAuditSink>,
    /// Signing key; the auditor generates an ephemeral one when unset
    pub signer: Option<AuditSigner>,
    /// Geo lookup
    pub geo: SharedGeoResolver,
    /// Bus that receives login and logout events
    pub events: Option<EventBus>,
    /// Metrics
    pub metrics: Option<EdgeMetrics>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            login_operation: DEFAULT_LOGIN_OPERATION.to_string(),
            logout_operation: DEFAULT_LOGOUT_OPERATION.to_string(),
            sink: None,
            signer: None,
            geo: Arc::new(NoopGeoResolver),
            events: None,
            metrics: None,
        }
    }
}

impl std::fmt::Debug for AuditOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditOptions")
            .field("login_operation", &self.login_operation)
            .field("logout_operation", &self.logout_operation)
            .field("sink", &self.sink.is_some())
            .field("signer", &self.signer)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl AuditOptions {
    /// Operations and signing key from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when the configured key cannot be loaded, or
    /// when a key is required and none is configured.
    pub fn from_config(config: &Config) -> Result<Self, SignerError> {
        let signer = AuditSigner::load(
            config.audit_signing_key_path.as_deref(),
            config.audit_require_signing_key,
        )?;
        Ok(Self {
            login_operation: config.login_operation.clone(),
            logout_operation: config.logout_operation.clone(),
            signer: Some(signer),
            ..Self::default()
        })
    }

    /// Sets the login operation id
    #[must_use]
    pub fn with_login_operation(mut self, operation: impl Into<String>) -> Self {
        self.login_operation = operation.into();
        self
    }

    /// Sets the logout operation id
    #[must_use]
    pub fn with_logout_operation(mut self, operation: impl Into<String>) -> Self {
        self.logout_operation = operation.into();
        self
    }

    /// Sets the record sink
    #[must_use]
    pub fn with_sink(mut self, sink: SharedAuditSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the signing key
    #[must_use]
    pub fn with_signer(mut self, signer: AuditSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Sets the geo resolver
    #[must_use]
    pub fn with_geo(mut self, geo: SharedGeoResolver) -> Self {
        self.geo = geo;
        self
    }

    /// Publish login and logout events on `bus`
    #[must_use]
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Sets the metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: EdgeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates the options
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the login operation is empty or
    /// equal to the logout operation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.login_operation.is_empty() {
            return Err(ConfigError::invalid("login_operation", "must not be empty"));
        }
        if self.login_operation == self.logout_operation {
            return Err(ConfigError::invalid(
                "logout_operation",
                "must differ from the login operation",
            ));
        }
        Ok(())
    }
}

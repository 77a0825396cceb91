//! Auth middleware options.

use std::collections::HashSet;

use crate::config::{Config, ConfigError};
use crate::observability::EdgeMetrics;
use crate::token::SharedChecker;

/// What the auth layer attaches to a request, and how it validates tokens.
#[derive(Clone)]
pub struct AuthOptions {
    /// Token checker; requests fail with `AccessTokenCheckerNotConfigured` without one
    pub checker: Option<SharedChecker>,
    /// Operations that skip token validation
    pub whitelist: HashSet<String>,
    /// Attach authorization claims
    pub enable_authz: bool,
    /// Write the user id into [`OperatorFields`](super::OperatorFields)
    pub inject_operator_id: bool,
    /// Write the tenant id into [`OperatorFields`](super::OperatorFields)
    pub inject_tenant_id: bool,
    /// Install a [`Viewer`](crate::viewer::Viewer)
    pub inject_viewer: bool,
    /// Attach the operator envelope
    pub inject_metadata: bool,
    /// Metrics
    pub metrics: Option<EdgeMetrics>,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            checker: None,
            whitelist: HashSet::new(),
            enable_authz: true,
            inject_operator_id: false,
            inject_tenant_id: false,
            inject_viewer: true,
            inject_metadata: true,
            metrics: None,
        }
    }
}

impl std::fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOptions")
            .field("checker", &self.checker.is_some())
            .field("whitelist", &self.whitelist)
            .field("enable_authz", &self.enable_authz)
            .field("inject_operator_id", &self.inject_operator_id)
            .field("inject_tenant_id", &self.inject_tenant_id)
            .field("inject_viewer", &self.inject_viewer)
            .field("inject_metadata", &self.inject_metadata)
            .finish_non_exhaustive()
    }
}

impl AuthOptions {
    /// Defaults plus the whitelist from `config`. The checker is still unset.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::default().with_whitelist(config.auth_whitelist.iter().cloned())
    }

    /// Sets the token checker
    #[must_use]
    pub fn with_checker(mut self, checker: SharedChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Adds operations that bypass token validation
    #[must_use]
    pub fn with_whitelist<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist.extend(operations.into_iter().map(Into::into));
        self
    }

    /// Enables or disables authorization claims
    #[must_use]
    pub const fn with_authz(mut self, enable: bool) -> Self {
        self.enable_authz = enable;
        self
    }

    /// Enables or disables operator id injection
    #[must_use]
    pub const fn with_inject_operator_id(mut self, enable: bool) -> Self {
        self.inject_operator_id = enable;
        self
    }

    /// Enables or disables tenant id injection
    #[must_use]
    pub const fn with_inject_tenant_id(mut self, enable: bool) -> Self {
        self.inject_tenant_id = enable;
        self
    }

    /// Enables or disables the viewer
    #[must_use]
    pub const fn with_inject_viewer(mut self, enable: bool) -> Self {
        self.inject_viewer = enable;
        self
    }

    /// Enables or disables the operator envelope
    #[must_use]
    pub const fn with_inject_metadata(mut self, enable: bool) -> Self {
        self.inject_metadata = enable;
        self
    }

    /// Sets the metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: EdgeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether `operation` skips token validation.
    #[must_use]
    pub fn is_whitelisted(&self, operation: &str) -> bool {
        self.whitelist.contains(operation)
    }

    /// Validates the options
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when no checker is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checker.is_none() {
            return Err(ConfigError::MissingRequired("access token checker".to_string()));
        }
        Ok(())
    }
}

//! Edge settings read from the environment.
//!
//! `.env` files are honoured through `dotenvy`. The component builders take
//! a [`Config`] through their `from_config` constructors.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::audit::DEFAULT_QUEUE_CAPACITY;
use crate::audit::options::{DEFAULT_LOGIN_OPERATION, DEFAULT_LOGOUT_OPERATION};
use crate::crypto::EncryptionConfig;
use crate::observability::TelemetryConfig;
use crate::proto::ClientType;
use crate::token::remote::DEFAULT_CHECK_TIMEOUT;

/// Configuration errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Variable name
        field: String,
        /// Parser message
        reason: String,
    },

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },

    /// Values that parse but do not make sense together
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid {
        /// Field name
        field: String,
        /// What was wrong
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Edge configuration with validation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Authentication service URL
    pub authn_service_url: Url,
    /// Client type sent with token checks
    pub authn_client_type: ClientType,
    /// Token check timeout
    pub token_check_timeout: Duration,
    /// Field encryption
    pub encryption: EncryptionConfig,
    /// PKCS#8 PEM P-256 key used to sign audit records
    pub audit_signing_key_path: Option<PathBuf>,
    /// Refuse to start with an ephemeral signing key
    pub audit_require_signing_key: bool,
    /// Bound of the audit queue
    pub audit_queue_capacity: usize,
    /// Operation id of login
    pub login_operation: String,
    /// Operation id of logout
    pub logout_operation: String,
    /// Operations that bypass token validation
    pub auth_whitelist: Vec<String>,
    /// Tracing setup
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Loads configuration from environment variables with validation.
    ///
    /// # Errors
    ///
    /// Returns the first parse or validation failure.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&|name: &str| env::var(name).ok())
    }

    /// Loads configuration from an explicit variable map.
    ///
    /// # Errors
    ///
    /// As [`from_env`](Self::from_env).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(&|name: &str| vars.get(name).cloned())
    }

    fn from_lookup(vars: Lookup<'_>) -> Result<Self, ConfigError> {
        let client_type = vars("AUTHN_CLIENT_TYPE").unwrap_or_else(|| "admin".to_string());
        let mut encryption = EncryptionConfig::default()
            .with_enabled(parse_env(vars, "ENCRYPTION_ENABLED", false)?);
        if let Some(key) = vars("ENCRYPTION_KEY") {
            encryption = encryption.with_key(key);
        }

        let config = Self {
            authn_service_url: parse_url_env(vars, "AUTHN_SERVICE_URL", "http://localhost:9000")?,
            authn_client_type: ClientType::parse(&client_type).ok_or_else(|| ConfigError::ParseError {
                name: "AUTHN_CLIENT_TYPE".to_string(),
                reason: format!("expected 'admin' or 'app', got '{client_type}'"),
            })?,
            token_check_timeout: Duration::from_secs(parse_env(
                vars,
                "TOKEN_CHECK_TIMEOUT",
                DEFAULT_CHECK_TIMEOUT.as_secs(),
            )?),
            encryption,
            audit_signing_key_path: vars("AUDIT_SIGNING_KEY_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            audit_require_signing_key: parse_env(vars, "AUDIT_REQUIRE_SIGNING_KEY", false)?,
            audit_queue_capacity: parse_env(vars, "AUDIT_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?,
            login_operation: vars("LOGIN_OPERATION")
                .unwrap_or_else(|| DEFAULT_LOGIN_OPERATION.to_string()),
            logout_operation: vars("LOGOUT_OPERATION")
                .unwrap_or_else(|| DEFAULT_LOGOUT_OPERATION.to_string()),
            auth_whitelist: parse_list_env(vars, "AUTH_WHITELIST"),
            telemetry: TelemetryConfig {
                service_name: vars("SERVICE_NAME").unwrap_or_else(|| "cms-edge".to_string()),
                otlp_endpoint: parse_optional_url_env(vars, "OTLP_ENDPOINT")?.map(String::from),
                ..TelemetryConfig::default()
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_check_timeout.is_zero() {
            return Err(ConfigError::ParseError {
                name: "TOKEN_CHECK_TIMEOUT".to_string(),
                reason: "timeout must be greater than 0".to_string(),
            });
        }
        if self.audit_queue_capacity == 0 {
            return Err(ConfigError::invalid("audit_queue_capacity", "must be greater than 0"));
        }
        if self.audit_require_signing_key && self.audit_signing_key_path.is_none() {
            return Err(ConfigError::MissingRequired("AUDIT_SIGNING_KEY_PATH".to_string()));
        }
        if self.login_operation.is_empty() {
            return Err(ConfigError::MissingRequired("LOGIN_OPERATION".to_string()));
        }
        self.encryption
            .validate()
            .map_err(|e| ConfigError::invalid("encryption", e.to_string()))?;
        Ok(())
    }
}

/// Variable lookup; `None` when unset.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parse an environment variable with a default value.
fn parse_env<T: std::str::FromStr>(vars: Lookup<'_>, name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match vars(name) {
        Some(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Parse a URL environment variable with a default value.
fn parse_url_env(vars: Lookup<'_>, name: &str, default: &str) -> Result<Url, ConfigError> {
    let url_str = vars(name).unwrap_or_else(|| default.to_string());
    Url::parse(&url_str).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}

/// Parse an optional URL environment variable; unset or empty is `None`.
fn parse_optional_url_env(vars: Lookup<'_>, name: &str) -> Result<Option<Url>, ConfigError> {
    match vars(name) {
        Some(v) if !v.trim().is_empty() => parse_url_env(vars, name, "").map(Some),
        _ => Ok(None),
    }
}

/// Parse a comma-separated list environment variable.
fn parse_list_env(vars: Lookup<'_>, name: &str) -> Vec<String> {
    vars(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

//! Checker backed by the authentication service.

use async_trait::async_trait;
use http::uri::PathAndQuery;
use std::time::{Duration, Instant};
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use super::checker::AccessTokenChecker;
use crate::config::Config;
use crate::observability::EdgeMetrics;
use crate::proto::{ClientType, TokenCategory, UserTokenPayload, ValidateTokenRequest, ValidateTokenResponse};

/// Full gRPC method path of `ValidateToken`.
pub const VALIDATE_TOKEN_PATH: &str = "/authentication.service.v1.AuthenticationService/ValidateToken";

/// Default ceiling on a single validation call.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Calls `AuthenticationService.ValidateToken` for every check.
///
/// RPC failures make a token invalid in [`is_valid_access_token`] and
/// blocked in [`is_blocked_access_token`].
///
/// [`is_valid_access_token`]: AccessTokenChecker::is_valid_access_token
/// [`is_blocked_access_token`]: AccessTokenChecker::is_blocked_access_token
#[derive(Debug, Clone)]
pub struct RemoteTokenChecker {
    channel: Channel,
    client_type: ClientType,
    timeout: Duration,
    metrics: Option<EdgeMetrics>,
}

impl RemoteTokenChecker {
    /// Checker over an existing channel.
    #[must_use]
    pub const fn new(channel: Channel, client_type: ClientType) -> Self {
        Self {
            channel,
            client_type,
            timeout: DEFAULT_CHECK_TIMEOUT,
            metrics: None,
        }
    }

    /// Checker with a lazily connected channel to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when `url` is not a valid URI.
    pub fn connect_lazy(url: &str, client_type: ClientType) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(url.to_string())?.connect_lazy();
        Ok(Self::new(channel, client_type))
    }

    /// Checker for the service, client type and timeout in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the service URL is not a valid URI.
    pub fn from_config(config: &Config) -> Result<Self, tonic::transport::Error> {
        Ok(Self::connect_lazy(config.authn_service_url.as_str(), config.authn_client_type)?
            .with_timeout(config.token_check_timeout))
    }

    /// Bound each call by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Record check latency on `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: EdgeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn validate(&self, token: &str, skip_cache: bool) -> Result<ValidateTokenResponse, Status> {
        let request = ValidateTokenRequest {
            token: token.to_string(),
            token_category: TokenCategory::Access as i32,
            client_type: self.client_type as i32,
            skip_redis: Some(skip_cache),
        };

        let call = async {
            let mut client = tonic::client::Grpc::new(self.channel.clone());
            client
                .ready()
                .await
                .map_err(|e| Status::unavailable(format!("authentication service not ready: {e}")))?;
            let response: Response<ValidateTokenResponse> = client
                .unary(
                    Request::new(request),
                    PathAndQuery::from_static(VALIDATE_TOKEN_PATH),
                    ProstCodec::default(),
                )
                .await?;
            Ok::<_, Status>(response.into_inner())
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Status::deadline_exceeded("token validation timed out"))?
    }
}

#[async_trait]
impl AccessTokenChecker for RemoteTokenChecker {
    async fn is_valid_access_token(&self, token: &str, skip_cache: bool) -> Option<UserTokenPayload> {
        let start = Instant::now();
        let result = match self.validate(token, skip_cache).await {
            Ok(response) if response.is_valid => Some(response.payload.unwrap_or_default()),
            Ok(_) => {
                debug!("Authentication service rejected access token");
                None
            }
            Err(status) => {
                warn!(code = ?status.code(), message = %status.message(), "Token validation call failed");
                None
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_token_check(result.is_some(), start.elapsed());
        }
        result
    }

    async fn is_blocked_access_token(&self, token: &str) -> bool {
        match self.validate(token, true).await {
            Ok(response) => !response.is_valid,
            Err(status) => {
                warn!(code = ?status.code(), message = %status.message(), "Token block check failed, treating as blocked");
                true
            }
        }
    }
}

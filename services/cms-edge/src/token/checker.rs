//! Access-token checker seam.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::proto::UserTokenPayload;

/// Decides whether a bearer token may be used.
#[async_trait]
pub trait AccessTokenChecker: Send + Sync {
    /// Claims of a valid token, `None` when invalid. `skip_cache` forces a
    /// live revocation check.
    async fn is_valid_access_token(&self, token: &str, skip_cache: bool) -> Option<UserTokenPayload>;

    /// Whether the token has been revoked.
    async fn is_blocked_access_token(&self, token: &str) -> bool;
}

/// Shared checker handle.
pub type SharedChecker = Arc<dyn AccessTokenChecker>;

type ValidFn = Arc<dyn Fn(String, bool) -> BoxFuture<'static, Option<UserTokenPayload>> + Send + Sync>;
type BlockFn = Arc<dyn Fn(String) -> BoxFuture<'static, bool> + Send + Sync>;

/// Checker assembled from two optional async closures.
///
/// Without a validity closure every token is valid with an empty payload;
/// without a block closure nothing is blocked.
#[derive(Clone, Default)]
pub struct ComposedChecker {
    valid: Option<ValidFn>,
    blocker: Option<BlockFn>,
}

impl std::fmt::Debug for ComposedChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedChecker")
            .field("valid", &self.valid.is_some())
            .field("blocker", &self.blocker.is_some())
            .finish()
    }
}

impl ComposedChecker {
    /// Checker with neither closure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the validity closure.
    #[must_use]
    pub fn with_valid<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<UserTokenPayload>> + Send + 'static,
    {
        self.valid = Some(Arc::new(move |token, skip| Box::pin(f(token, skip))));
        self
    }

    /// Set the block closure.
    #[must_use]
    pub fn with_blocker<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.blocker = Some(Arc::new(move |token| Box::pin(f(token))));
        self
    }
}

#[async_trait]
impl AccessTokenChecker for ComposedChecker {
    async fn is_valid_access_token(&self, token: &str, skip_cache: bool) -> Option<UserTokenPayload> {
        match &self.valid {
            Some(valid) => valid(token.to_string(), skip_cache).await,
            None => Some(UserTokenPayload::default()),
        }
    }

    async fn is_blocked_access_token(&self, token: &str) -> bool {
        match &self.blocker {
            Some(blocker) => blocker(token.to_string()).await,
            None => false,
        }
    }
}

//! Client address geolocation.

use async_trait::async_trait;
use std::sync::Arc;

use crate::proto::GeoLocation;

/// Resolves a client address to a location.
///
/// Implementations return `None` when the address is unknown; the record
/// then carries an empty [`GeoLocation`], never a missing one.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Look up `ip`.
    async fn lookup(&self, ip: &str) -> Option<GeoLocation>;
}

/// Shared resolver.
pub type SharedGeoResolver = Arc<dyn GeoResolver>;

/// Resolver that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGeoResolver;

#[async_trait]
impl GeoResolver for NoopGeoResolver {
    async fn lookup(&self, _ip: &str) -> Option<GeoLocation> {
        None
    }
}

/// Location for the record, empty when unresolved.
pub async fn resolve(resolver: &dyn GeoResolver, ip: &str) -> GeoLocation {
    if ip.is_empty() {
        return GeoLocation::default();
    }
    resolver.lookup(ip).await.unwrap_or_default()
}

//! Cache client interface used by higher-level services (token cache, distributed lock).
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-layer errors (transport/command/serialization).
///
/// Note:
/// - We keep this independent from `AppError` so callers decide how to fail.
///   The token cache propagates every one of these to the handler unchanged.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    BackendConnection(String),
    #[error("cache command error: {0}")]
    BackendCommand(String),
    #[error("cache value error: {0}")]
    InvalidValue(String),
}

/// A value read from the cache together with its remaining lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedValue {
    pub value: String,
    /// `None` when the key exists without an expiry.
    pub ttl: Option<Duration>,
}

/// A minimal cache interface.
///
/// This is intentionally small and string-based:
/// - The token cache needs `GET` (+ remaining TTL) and `SET` with TTL.
/// - The distributed lock needs `SET NX` + TTL and a compare-and-delete.
///
/// Implementations must be cheap to clone (typically `Arc<...>` inside)
#[async_trait]
pub trait CacheClient: Clone + Send + Sync + 'static {
    // Returns the cache backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // Get UTF-8 string value and its remaining TTL in one round trip.
    async fn get_with_ttl(&self, key: &str) -> CacheResult<Option<CachedValue>>;

    // Set value unconditionally, with TTL.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    // Set value if the key does not exist, with TTL.
    //
    // Returns:
    // - `Ok(true)`  if the key was set
    // - `Ok(false)` if the key already exists
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool>;

    // Delete a key only while it still holds `expected`.
    //
    // Returns `Ok(true)` if the key was deleted.
    async fn delete_if_value(&self, key: &str, expected: &str) -> CacheResult<bool>;

    async fn ping(&self) -> CacheResult<()>;
}

/// Object-safe view of a cache used by the health endpoint.
///
/// `CacheClient` is not dyn-compatible (`Clone` supertrait), so `AppState`
/// holds the backend behind this trait instead.
#[async_trait]
pub trait StoreHealth: Send + Sync + 'static {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> CacheResult<()>;
}

#[async_trait]
impl<C: CacheClient> StoreHealth for C {
    fn backend_name(&self) -> &'static str {
        CacheClient::backend_name(self)
    }

    async fn ping(&self) -> CacheResult<()> {
        CacheClient::ping(self).await
    }
}

/// Redis `EX`/`PX` reject a zero expiry, and a sub-second TTL is too short to be useful.
pub(crate) fn ttl_floor(ttl: Duration) -> Duration {
    ttl.max(Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_floor_clamps_to_one_second() {
        assert_eq!(ttl_floor(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(ttl_floor(Duration::from_millis(300)), Duration::from_secs(1));
        assert_eq!(ttl_floor(Duration::from_secs(42)), Duration::from_secs(42));
    }
}

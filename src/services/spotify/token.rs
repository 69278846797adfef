//! Shared access-token cache with single-flight refresh.
//!
//! Every process instance reads the token from the shared cache. On a miss,
//! exactly one caller (across all instances) wins the refresh lock, calls the
//! credential provider and writes the token back with a TTL; everyone else
//! backs off and re-reads until the token appears, the lock frees up, or the
//! wait budget runs out.
//!
//! Flow:
//! 1. `GET spotify:access_token` -> hit: return
//! 2. `SET spotify:token:lock <owner> NX EX <lock_ttl>`
//!    - won: re-check cache, else fetch -> `SET ... PX <ttl>` -> release lock
//!    - lost: sleep `retry_delay`, go to 1
use async_trait::async_trait;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::{Instant, sleep, timeout};

use crate::services::{
    cache::{CacheClient, CacheError},
    lock::{DistributedLock, LockGuard},
    spotify::provider::{CredentialProvider, ProviderError},
};

pub const ACCESS_TOKEN_KEY: &str = "spotify:access_token";
pub const TOKEN_LOCK_KEY: &str = "spotify:token:lock";

/// An access token and its remaining validity in seconds.
///
/// Immutable: a refresh replaces the cached value wholesale.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_in: u64,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            token: token.into(),
            expires_in,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing configuration: {0}")]
    Configuration(&'static str),

    #[error(transparent)]
    Store(#[from] CacheError),

    #[error("credential provider error: {0}")]
    Provider(#[source] ProviderError),

    #[error("malformed credential response: {0}")]
    Decode(String),

    #[error("token refresh still in progress after {waited:?} ({attempts} attempts)")]
    ContentionTimeout { waited: Duration, attempts: u32 },

    #[error("no token within the caller deadline of {0:?}")]
    Deadline(Duration),
}

impl From<ProviderError> for TokenError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Decode(msg) => TokenError::Decode(msg),
            other => TokenError::Provider(other),
        }
    }
}

/// Tuning for [`TokenCache`].
#[derive(Clone, Debug)]
pub struct TokenCacheSettings {
    /// Subtracted from `expires_in` so a cached token never expires mid-request.
    pub safety_margin: Duration,
    /// Self-healing bound on how long a crashed refresher blocks others.
    pub lock_ttl: Duration,
    /// Back-off between attempts while another caller refreshes.
    pub retry_delay: Duration,
    /// Total time a caller keeps retrying before `ContentionTimeout`.
    pub wait_budget: Duration,
    /// Upper bound on one provider call. Must stay below `lock_ttl`.
    pub provider_timeout: Duration,
}

impl Default for TokenCacheSettings {
    fn default() -> Self {
        let lock_ttl = Duration::from_secs(10);
        Self {
            safety_margin: Duration::from_secs(60),
            lock_ttl,
            retry_delay: Duration::from_millis(200),
            wait_budget: lock_ttl * 3,
            provider_timeout: Duration::from_secs(5),
        }
    }
}

/// Cache TTL for a freshly issued token: `expires_in - safety_margin`, at least 1s.
pub fn cache_ttl(expires_in: u64, safety_margin: Duration) -> Duration {
    Duration::from_secs(expires_in)
        .saturating_sub(safety_margin)
        .max(Duration::from_secs(1))
}

/// Handler-facing seam. Object-safe so `AppState` can hold `Arc<dyn TokenSource>`.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn access_token(&self) -> Result<AccessToken, TokenError>;
}

pub struct TokenCache<C, L, P>
where
    C: CacheClient,
    L: DistributedLock,
    P: CredentialProvider,
{
    cache: Arc<C>,
    lock: Arc<L>,
    provider: Arc<P>,
    settings: TokenCacheSettings,
}

impl<C, L, P> TokenCache<C, L, P>
where
    C: CacheClient,
    L: DistributedLock,
    P: CredentialProvider,
{
    pub fn new(cache: Arc<C>, lock: Arc<L>, provider: Arc<P>, settings: TokenCacheSettings) -> Self {
        Self {
            cache,
            lock,
            provider,
            settings,
        }
    }

    /// Return a currently valid token, refreshing it at most once across all
    /// concurrent callers sharing the cache.
    pub async fn get_token(&self) -> Result<AccessToken, TokenError> {
        // Missing credentials never resolve by waiting: fail before touching the store.
        self.provider.ensure_configured()?;

        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            if let Some(token) = self.read_cached().await? {
                return Ok(token);
            }

            if let Some(token) = self
                .lock
                .try_acquire(TOKEN_LOCK_KEY, self.settings.lock_ttl)
                .await?
            {
                let guard = LockGuard::new(Arc::clone(&self.lock), token);
                let result = self.refresh_holding_lock().await;
                guard.release().await;
                return result;
            }

            let waited = started.elapsed();
            if waited + self.settings.retry_delay > self.settings.wait_budget {
                tracing::warn!(?waited, attempts, "gave up waiting for token refresh");
                return Err(TokenError::ContentionTimeout { waited, attempts });
            }

            tracing::debug!(attempts, "token refresh in progress elsewhere, backing off");
            sleep(self.settings.retry_delay).await;
        }
    }

    /// Like [`get_token`](Self::get_token), bounded by a caller deadline.
    ///
    /// If the deadline hits while this caller holds the refresh lock, the lock
    /// is released in the background.
    pub async fn get_token_within(&self, deadline: Duration) -> Result<AccessToken, TokenError> {
        timeout(deadline, self.get_token())
            .await
            .map_err(|_| TokenError::Deadline(deadline))?
    }

    async fn read_cached(&self) -> Result<Option<AccessToken>, TokenError> {
        let hit = self.cache.get_with_ttl(ACCESS_TOKEN_KEY).await?;

        Ok(hit.map(|cached| {
            let expires_in = cached.ttl.map_or(0, |ttl| ttl.as_secs());
            AccessToken::new(cached.value, expires_in)
        }))
    }

    async fn refresh_holding_lock(&self) -> Result<AccessToken, TokenError> {
        // Our first read and the lock acquisition are separate round trips;
        // a refresh may have completed in between.
        if let Some(token) = self.read_cached().await? {
            tracing::debug!("token refreshed by another caller while acquiring lock");
            return Ok(token);
        }

        let fetched = match timeout(self.settings.provider_timeout, self.provider.fetch_token()).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.settings.provider_timeout)),
        };
        let token =
            fetched.inspect_err(|err| tracing::error!(error = %err, "credential refresh failed"))?;

        let ttl = cache_ttl(token.expires_in(), self.settings.safety_margin);
        self.cache
            .set_with_ttl(ACCESS_TOKEN_KEY, token.token(), ttl)
            .await?;

        tracing::info!(
            backend = self.cache.backend_name(),
            expires_in = token.expires_in(),
            cache_ttl_secs = ttl.as_secs(),
            "access token refreshed"
        );

        Ok(token)
    }
}

#[async_trait]
impl<C, L, P> TokenSource for TokenCache<C, L, P>
where
    C: CacheClient,
    L: DistributedLock,
    P: CredentialProvider,
{
    async fn access_token(&self) -> Result<AccessToken, TokenError> {
        self.get_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_ttl_subtracts_margin() {
        let margin = Duration::from_secs(60);

        assert_eq!(cache_ttl(3600, margin), Duration::from_secs(3540));
        assert!(cache_ttl(3600, margin) < Duration::from_secs(3600));
    }

    #[test]
    fn cache_ttl_floors_short_and_missing_lifetimes() {
        let margin = Duration::from_secs(60);

        assert_eq!(cache_ttl(0, margin), Duration::from_secs(1));
        assert_eq!(cache_ttl(30, margin), Duration::from_secs(1));
    }

    #[test]
    fn provider_decode_errors_map_to_decode() {
        let err: TokenError = ProviderError::Decode("bad json".into()).into();
        assert!(matches!(err, TokenError::Decode(_)));

        let err: TokenError = ProviderError::Status {
            status: 400,
            body: "invalid_client".into(),
        }
        .into();
        assert!(matches!(err, TokenError::Provider(ProviderError::Status { status: 400, .. })));
    }

    #[test]
    fn debug_output_hides_token() {
        let token = AccessToken::new("very-secret", 10);
        assert!(!format!("{token:?}").contains("very-secret"));
    }
}

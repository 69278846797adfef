#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use spotify_proxy::services::{
    cache::{CacheClient, CacheResult, MemoryCache},
    lock::{CacheLock, DistributedLock, LockToken},
    spotify::{
        AccessToken, CredentialProvider, ProviderError, TokenCache, TokenCacheSettings,
        TokenError,
    },
};

/// What the next provider call does.
#[derive(Clone, Debug)]
pub enum Outcome {
    Token(&'static str, u64),
    Status(u16),
    Malformed,
    Hang,
}

/// Credential provider double that counts calls and replays scripted outcomes.
/// With no script left it issues `token-<n>` valid for an hour.
pub struct MockProvider {
    calls: AtomicUsize,
    delay: Duration,
    configured: bool,
    script: Mutex<VecDeque<Outcome>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            configured: true,
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn then(self, outcome: Outcome) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for MockProvider {
    fn ensure_configured(&self) -> Result<(), TokenError> {
        if self.configured {
            Ok(())
        } else {
            Err(TokenError::Configuration("SPOTIFY_CLIENT_ID"))
        }
    }

    async fn fetch_token(&self) -> Result<AccessToken, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().pop_front();
        match next {
            None => Ok(AccessToken::new(format!("token-{n}"), 3600)),
            Some(Outcome::Token(token, expires_in)) => Ok(AccessToken::new(token, expires_in)),
            Some(Outcome::Status(status)) => Err(ProviderError::Status {
                status,
                body: r#"{"error":"server_error"}"#.into(),
            }),
            Some(Outcome::Malformed) => Err(ProviderError::Decode("expected value".into())),
            Some(Outcome::Hang) => std::future::pending().await,
        }
    }
}

/// Lock wrapper that counts acquisition attempts.
pub struct CountingLock<L: DistributedLock> {
    inner: L,
    attempts: AtomicUsize,
}

impl<L: DistributedLock> CountingLock<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<L: DistributedLock> DistributedLock for CountingLock<L> {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> CacheResult<Option<LockToken>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.try_acquire(key, ttl).await
    }

    async fn release(&self, token: &LockToken) -> CacheResult<bool> {
        self.inner.release(token).await
    }
}

/// Lock that lets another "instance" finish a refresh right before this caller wins the lock.
pub struct RacingLock<C: CacheClient> {
    inner: CacheLock<C>,
    cache: Arc<C>,
    token: &'static str,
}

impl<C: CacheClient> RacingLock<C> {
    pub fn new(cache: Arc<C>, token: &'static str) -> Self {
        Self {
            inner: CacheLock::new(Arc::clone(&cache)),
            cache,
            token,
        }
    }
}

#[async_trait]
impl<C: CacheClient> DistributedLock for RacingLock<C> {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> CacheResult<Option<LockToken>> {
        self.cache
            .set_with_ttl(
                spotify_proxy::services::spotify::token::ACCESS_TOKEN_KEY,
                self.token,
                Duration::from_secs(600),
            )
            .await?;
        self.inner.try_acquire(key, ttl).await
    }

    async fn release(&self, token: &LockToken) -> CacheResult<bool> {
        self.inner.release(token).await
    }
}

pub type TestLock = CountingLock<CacheLock<MemoryCache>>;
pub type TestTokenCache = TokenCache<MemoryCache, TestLock, MockProvider>;

pub struct Harness {
    pub cache: Arc<MemoryCache>,
    pub lock: Arc<TestLock>,
    pub provider: Arc<MockProvider>,
    pub tokens: Arc<TestTokenCache>,
}

impl Harness {
    pub fn new(provider: MockProvider) -> Self {
        Self::with_settings(provider, TokenCacheSettings::default())
    }

    pub fn with_settings(provider: MockProvider, settings: TokenCacheSettings) -> Self {
        let cache = Arc::new(MemoryCache::new());
        let lock = Arc::new(CountingLock::new(CacheLock::new(Arc::clone(&cache))));
        let provider = Arc::new(provider);
        let tokens = Arc::new(TokenCache::new(
            Arc::clone(&cache),
            Arc::clone(&lock),
            Arc::clone(&provider),
            settings,
        ));

        Self {
            cache,
            lock,
            provider,
            tokens,
        }
    }
}

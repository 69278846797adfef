//! Cross-process mutual exclusion on top of the shared cache.
//!
//! A lock is a cache entry written with `SET NX` and a short TTL. The TTL makes
//! the lock self-healing: a holder that dies without releasing only blocks
//! others until the entry expires. The entry value is a per-acquisition owner
//! id, and release is a compare-and-delete, so a holder whose lock already
//! expired can never delete the lock of the next holder.
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::services::cache::{CacheClient, CacheResult};

/// Proof of a successful acquisition. Needed to release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockToken {
    pub key: String,
    pub owner: String,
}

#[async_trait]
pub trait DistributedLock: Send + Sync + 'static {
    /// Returns `Ok(None)` when another holder owns `key`.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> CacheResult<Option<LockToken>>;

    /// Returns `Ok(false)` when the lock had already expired or changed hands.
    async fn release(&self, token: &LockToken) -> CacheResult<bool>;
}

/// [`DistributedLock`] backed by any [`CacheClient`].
#[derive(Clone, Debug)]
pub struct CacheLock<C: CacheClient> {
    cache: Arc<C>,
}

impl<C: CacheClient> CacheLock<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl<C: CacheClient> DistributedLock for CacheLock<C> {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> CacheResult<Option<LockToken>> {
        let owner = Uuid::new_v4().to_string();

        let acquired = self.cache.set_if_absent_with_ttl(key, &owner, ttl).await?;

        Ok(acquired.then(|| LockToken {
            key: key.to_string(),
            owner,
        }))
    }

    async fn release(&self, token: &LockToken) -> CacheResult<bool> {
        self.cache.delete_if_value(&token.key, &token.owner).await
    }
}

/// Holds an acquired lock until it is released.
///
/// Normal exit paths call [`LockGuard::release`]. If the guard is dropped
/// unreleased (the owning future was cancelled), a release is spawned on the
/// current runtime; when no runtime is available the lock TTL cleans up.
pub struct LockGuard<L: DistributedLock> {
    lock: Arc<L>,
    token: Option<LockToken>,
}

impl<L: DistributedLock> LockGuard<L> {
    pub fn new(lock: Arc<L>, token: LockToken) -> Self {
        Self {
            lock,
            token: Some(token),
        }
    }

    /// Release the lock. Failures are logged, not returned: the TTL bounds the
    /// damage and the caller's own result must not be replaced by a release error.
    pub async fn release(mut self) {
        if let Some(token) = self.token.take() {
            release_logged(self.lock.as_ref(), &token).await;
        }
    }
}

impl<L: DistributedLock> Drop for LockGuard<L> {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let lock = Arc::clone(&self.lock);
                tracing::debug!(key = %token.key, "lock guard dropped, releasing in background");
                handle.spawn(async move {
                    release_logged(lock.as_ref(), &token).await;
                });
            }
            Err(_) => {
                tracing::warn!(key = %token.key, "no runtime to release lock, leaving it to expire");
            }
        }
    }
}

async fn release_logged<L: DistributedLock + ?Sized>(lock: &L, token: &LockToken) {
    match lock.release(token).await {
        Ok(true) => tracing::debug!(key = %token.key, "lock released"),
        Ok(false) => tracing::warn!(key = %token.key, "lock expired before release"),
        Err(err) => tracing::warn!(key = %token.key, error = %err, "lock release failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::MemoryCache;

    const KEY: &str = "test:lock";

    #[tokio::test]
    async fn only_one_holder_at_a_time() {
        let cache = Arc::new(MemoryCache::new());
        let lock = CacheLock::new(Arc::clone(&cache));
        let ttl = Duration::from_secs(10);

        let first = lock.try_acquire(KEY, ttl).await.expect("acquire");
        let token = first.expect("first caller should win");
        assert!(lock.try_acquire(KEY, ttl).await.expect("acquire").is_none());

        assert!(lock.release(&token).await.expect("release"));
        assert!(lock.try_acquire(KEY, ttl).await.expect("acquire").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_holder_cannot_release_new_holders_lock() {
        let cache = Arc::new(MemoryCache::new());
        let lock = CacheLock::new(Arc::clone(&cache));
        let ttl = Duration::from_secs(10);

        let stale = lock
            .try_acquire(KEY, ttl)
            .await
            .expect("acquire")
            .expect("lock should be free");
        tokio::time::advance(ttl).await;

        let fresh = lock
            .try_acquire(KEY, ttl)
            .await
            .expect("acquire")
            .expect("expired lock should be acquirable");

        assert!(!lock.release(&stale).await.expect("release"));
        assert!(cache.contains_key(KEY));
        assert!(lock.release(&fresh).await.expect("release"));
    }

    #[tokio::test]
    async fn dropped_guard_releases_in_background() {
        let cache = Arc::new(MemoryCache::new());
        let lock = Arc::new(CacheLock::new(Arc::clone(&cache)));
        let token = lock
            .try_acquire(KEY, Duration::from_secs(10))
            .await
            .expect("acquire")
            .expect("lock should be free");

        drop(LockGuard::new(Arc::clone(&lock), token));

        for _ in 0..10 {
            if !cache.contains_key(KEY) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("dropped guard did not release the lock");
    }
}

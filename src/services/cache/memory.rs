//! In-process [`CacheClient`] for tests and local development.
//!
//! Expiry is tracked with `tokio::time::Instant`, so tests running on a paused
//! clock see entries expire when the clock is advanced. Expired entries are
//! evicted lazily on access.
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::time::Instant;

use crate::services::cache::client::{CacheClient, CacheResult, CachedValue, ttl_floor};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

type EntryMap = Arc<Mutex<HashMap<String, Entry>>>;

/// Shared, TTL-aware key-value map. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(EntryMap);

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.0.lock().values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.0
            .lock()
            .get(key)
            .is_some_and(|e| e.expires_at > now)
    }

    fn insert(map: &mut HashMap<String, Entry>, key: &str, value: &str, ttl: Duration) {
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl_floor(ttl),
            },
        );
    }

    fn evict_expired(map: &mut HashMap<String, Entry>, key: &str, now: Instant) {
        if map.get(key).is_some_and(|e| e.expires_at <= now) {
            map.remove(key);
        }
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_with_ttl(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        let now = Instant::now();
        let mut map = self.0.lock();
        Self::evict_expired(&mut map, key, now);

        Ok(map.get(key).map(|e| CachedValue {
            value: e.value.clone(),
            ttl: Some(e.expires_at - now),
        }))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        Self::insert(&mut self.0.lock(), key, value, ttl);
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let mut map = self.0.lock();
        Self::evict_expired(&mut map, key, Instant::now());

        if map.contains_key(key) {
            return Ok(false);
        }
        Self::insert(&mut map, key, value, ttl);
        Ok(true)
    }

    async fn delete_if_value(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let mut map = self.0.lock();
        Self::evict_expired(&mut map, key, Instant::now());

        match map.get(key) {
            Some(e) if e.value == expected => {
                map.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

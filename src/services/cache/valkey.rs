use async_trait::async_trait;
use std::time::Duration;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult, CachedValue, ttl_floor};

// Deletes KEYS[1] only while it still holds ARGV[1].
const DELETE_IF_VALUE_LUA: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Valkey/Redis-backend cache client.
///
/// One connection manager is created at startup and shared by every handler;
/// clones are cheap and multiplex over the same connection.
#[derive(Clone)]
pub struct ValkeyClient {
    manager: redis::aio::ConnectionManager,
    delete_if_value: redis::Script,
}

impl std::fmt::Debug for ValkeyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyClient").finish_non_exhaustive()
    }
}

impl ValkeyClient {
    // Create a Valkey client from a URL like `redis://localhost:6379/0`
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(Self {
            manager,
            delete_if_value: redis::Script::new(DELETE_IF_VALUE_LUA),
        })
    }
}

#[async_trait]
impl CacheClient for ValkeyClient {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn get_with_ttl(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        let mut conn = self.manager.clone();

        // MULTI; GET key; PTTL key; EXEC
        // PTTL: -2 when the key is missing, -1 when it has no expiry.
        let (value, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        Ok(value.map(|value| CachedValue {
            value,
            ttl: u64::try_from(pttl).ok().map(Duration::from_millis),
        }))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let ttl_millis = u64::try_from(ttl_floor(ttl).as_millis())
            .map_err(|_| CacheError::InvalidValue(format!("ttl out of range: {ttl:?}")))?;

        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        // Redis/Valkey: `SET key value NX EX <seconds>`
        // returns:
        // - `OK` if set
        // - Nil if not set
        let mut conn = self.manager.clone();

        // EX expects integer seconds. We clamp to at least 1 sec.
        let ttl_seconds: u64 = ttl_floor(ttl).as_secs();

        let resp: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        Ok(resp.is_some())
    }

    async fn delete_if_value(&self, key: &str, expected: &str) -> CacheResult<bool> {
        let mut conn = self.manager.clone();

        let deleted: u64 = self
            .delete_if_value
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        Ok(deleted > 0)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(())
    }
}

//! Redis-backed lock store.

use std::time::Duration;

use async_trait::async_trait;
use redis::Client as RedisClient;

use crate::{LockStore, LockToken, Result};

/// Lua script releasing a lock only when the stored token matches.
///
/// The compare and the delete run as one atomic step inside Redis, so a
/// holder whose lock expired and was re-acquired cannot delete the new
/// holder's entry.
const RELEASE_SCRIPT: &str = r#"
    if redis.call("get", KEYS[1]) == ARGV[1] then
        return redis.call("del", KEYS[1])
    else
        return 0
    end
"#;

/// Redis-backed lock store implementation.
///
/// Acquisition is a single `SET key token NX PX <ttl_ms>`: Redis stores the
/// token only when the key is absent, and expires the entry after the TTL.
#[derive(Clone)]
pub struct RedisLockStore {
    client: RedisClient,
}

impl RedisLockStore {
    /// Creates a lock store from an existing Redis client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Creates a lock store by connecting to the given Redis URL.
    ///
    /// Example: `redis://127.0.0.1:6379/`.
    pub fn connect(url: &str) -> Result<Self> {
        let client = RedisClient::open(url)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn try_acquire(&self, key: &str, token: &LockToken, ttl: Duration) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET key value NX PX milliseconds
        // NX: only set when the key does not exist
        // PX: expiry in milliseconds
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token.to_string())
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        // SET NX replies "OK" on success and nil when the key is held.
        Ok(result.is_some())
    }

    async fn release(&self, key: &str, token: &LockToken) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let deleted: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(key)
            .arg(token.to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(deleted == 1)
    }
}

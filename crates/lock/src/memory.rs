use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{LockStore, LockToken, Result};

#[derive(Debug, Clone)]
struct LockEntry {
    token: LockToken,
    expires_at: Instant,
}

/// In-memory lock store implementation for testing and single-process use.
///
/// Provides the same atomic semantics as the Redis implementation. Expired
/// entries count as absent and are replaced on the next acquisition; there
/// is no background sweeper.
#[derive(Clone, Default)]
pub struct InMemoryLockStore {
    entries: Arc<RwLock<HashMap<String, LockEntry>>>,
}

impl InMemoryLockStore {
    /// Creates a new empty in-memory lock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of unexpired entries currently held.
    pub async fn active_count(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn try_acquire(&self, key: &str, token: &LockToken, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        if let Some(existing) = entries.get(key)
            && existing.expires_at > now
        {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            LockEntry {
                token: *token,
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str, token: &LockToken) -> Result<bool> {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(existing) if existing.token == *token => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

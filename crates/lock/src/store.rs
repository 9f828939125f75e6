use std::time::Duration;

use async_trait::async_trait;

use crate::{LockToken, Result};

/// Core trait for lock store backends.
///
/// A lock store is a shared key-value store offering exactly two atomic
/// primitives: set-if-absent with expiry, and compare-and-delete. Everything
/// else about the lock protocol (key prefixing, token generation, TTL
/// defaults) lives in [`crate::DistributedLock`].
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Attempts one atomic "set value if absent, with expiry" write.
    ///
    /// Returns true if the key was vacant (or held only an expired entry)
    /// and the token was stored; false if an unexpired entry already holds
    /// the key. Never retries.
    async fn try_acquire(&self, key: &str, token: &LockToken, ttl: Duration) -> Result<bool>;

    /// Atomically deletes the key only if it currently holds `token`.
    ///
    /// Returns whether a deletion occurred. The compare and the delete must
    /// be one atomic step: a read-then-delete would let a stale holder
    /// remove a lock re-acquired by someone else after expiry.
    async fn release(&self, key: &str, token: &LockToken) -> Result<bool>;
}

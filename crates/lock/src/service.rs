//! Lock service front: token generation, key prefixing, TTL defaults.

use std::time::Duration;

use crate::{LockStore, LockToken, Result};

/// Prefix applied to every lock key in the shared store.
const LOCK_PREFIX: &str = "lock:";

/// Lock service configuration.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// TTL applied when the caller does not supply one.
    pub default_ttl: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(30),
        }
    }
}

/// Distributed lock service over a pluggable store backend.
///
/// Each acquisition attempt writes a freshly generated token; the token is
/// required to release. Acquisition is non-blocking and single-shot — the
/// caller owns any backoff strategy.
pub struct DistributedLock<S: LockStore> {
    store: S,
    config: LockConfig,
}

impl<S: LockStore> DistributedLock<S> {
    /// Creates a lock service with the given store and configuration.
    pub fn new(store: S, config: LockConfig) -> Self {
        Self { store, config }
    }

    /// Creates a lock service with the default 30 second TTL.
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, LockConfig::default())
    }

    /// Attempts to acquire the lock for `resource` with the default TTL.
    ///
    /// Returns the ownership token on success, `None` when the resource is
    /// already locked. Makes exactly one attempt.
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self, resource: &str) -> Result<Option<LockToken>> {
        self.acquire_with_ttl(resource, self.config.default_ttl)
            .await
    }

    /// Attempts to acquire the lock for `resource` with an explicit TTL.
    #[tracing::instrument(skip(self))]
    pub async fn acquire_with_ttl(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockToken>> {
        let token = LockToken::new();
        let key = format!("{LOCK_PREFIX}{resource}");

        if self.store.try_acquire(&key, &token, ttl).await? {
            tracing::debug!(resource, %token, "lock acquired");
            Ok(Some(token))
        } else {
            tracing::debug!(resource, "lock busy");
            Ok(None)
        }
    }

    /// Releases the lock for `resource` if `token` still owns it.
    ///
    /// Returns whether an entry was removed. A false return means the lock
    /// already expired or belongs to another holder — both benign from the
    /// releaser's point of view, so this is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, resource: &str, token: &LockToken) -> Result<bool> {
        let key = format!("{LOCK_PREFIX}{resource}");
        let released = self.store.release(&key, token).await?;

        if released {
            tracing::debug!(resource, "lock released");
        } else {
            tracing::warn!(
                resource,
                %token,
                "lock was already released or owned by another holder"
            );
        }

        Ok(released)
    }
}

use thiserror::Error;

/// Errors that can occur when talking to the lock store.
#[derive(Debug, Error)]
pub enum LockError {
    /// The Redis backend failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The lock store backend failed for another reason.
    #[error("Lock store error: {0}")]
    Backend(String),
}

/// Result type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

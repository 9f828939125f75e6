//! Distributed mutual-exclusion lock keyed by resource name.
//!
//! The lock is a single entry in a shared key-value store: at most one
//! unexpired entry exists per key, the value is an opaque ownership token,
//! and the entry self-expires after a TTL so a crashed holder cannot wedge
//! the resource forever.
//!
//! Acquisition is non-blocking and single-shot — callers back off by
//! rescheduling their own work, never by spinning here. There is no renewal
//! mechanism: a critical section that outlives the TTL can be superseded by
//! another acquirer.

pub mod error;
pub mod memory;
pub mod redis;
pub mod service;
pub mod store;
pub mod token;

pub use error::{LockError, Result};
pub use memory::InMemoryLockStore;
pub use redis::RedisLockStore;
pub use service::{DistributedLock, LockConfig};
pub use store::LockStore;
pub use token::LockToken;

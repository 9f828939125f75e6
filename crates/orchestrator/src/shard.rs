//! Deterministic shard assignment.

use sha2::{Digest, Sha256};

use common::OrderId;

/// Maps order identifiers to shard indices.
///
/// The shard index is stored on the order but does not affect where reads
/// or writes go today — it is the seam for future physical multi-store
/// routing, nothing more.
#[derive(Debug, Clone, Copy)]
pub struct ShardRouter {
    shard_count: u32,
}

impl ShardRouter {
    /// Creates a router over `shard_count` shards.
    ///
    /// # Panics
    ///
    /// Panics if `shard_count` is zero.
    pub fn new(shard_count: u32) -> Self {
        assert!(shard_count > 0, "shard_count must be at least 1");
        Self { shard_count }
    }

    /// Returns the configured shard count.
    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Returns the shard index for an order, in `[0, shard_count)`.
    ///
    /// Pure function of the order id: hashes the UUID bytes and reduces the
    /// first four digest bytes modulo the shard count.
    pub fn shard_of(&self, order_id: OrderId) -> u32 {
        let digest = Sha256::digest(order_id.as_uuid().as_bytes());
        let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        prefix % self.shard_count
    }
}

impl Default for ShardRouter {
    /// Four shards, matching the deployment default.
    fn default() -> Self {
        Self::new(4)
    }
}

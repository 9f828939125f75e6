use std::collections::HashMap;

use async_trait::async_trait;

use common::{Order, OrderId, ProductId};

use crate::{InventoryRecord, Result, StockDecrement, StockRequest, StockVersion};

/// Outcome of an order-processing commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every decrement applied and the order moved to `processed`.
    Committed,

    /// A decrement found a changed version or too little stock; the whole
    /// transaction was rolled back and nothing persisted.
    Conflict {
        /// The first product whose conditional write failed.
        product_id: ProductId,
    },
}

/// Versioned inventory ledger operations.
///
/// Records are mutated exclusively through [`decrement`](Self::decrement)
/// (or the batched commit in [`FulfillmentStore`]); `upsert_record` exists
/// only as the provisioning seam for stocking products.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Returns the record for a product, if stocked.
    async fn get_record(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>>;

    /// Creates or replaces a product's stock record.
    async fn upsert_record(&self, record: InventoryRecord) -> Result<()>;

    /// Reads the current version of every requested product without taking
    /// any lock.
    ///
    /// Fails with [`StoreError::InsufficientStock`](crate::StoreError) when
    /// any product is missing or short, listing *all* insufficient products
    /// so the caller can report them in one pass.
    async fn snapshot_versions(
        &self,
        requests: &[StockRequest],
    ) -> Result<HashMap<ProductId, StockVersion>>;

    /// One atomic conditional write: decrements `quantity` and bumps the
    /// version by exactly 1 iff the stored version still equals
    /// `expected_version` and the resulting quantity stays >= 0.
    ///
    /// Returns whether the write applied. On a miss the record is left
    /// untouched.
    async fn decrement(
        &self,
        product_id: &ProductId,
        expected_version: StockVersion,
        quantity: u32,
    ) -> Result<bool>;
}

/// Order persistence operations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order and its items as a single atomic unit — all rows
    /// visible together or none.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order with its items. Returns None if it does not exist.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;
}

/// Combined store surface used by the processing worker.
///
/// `commit_processing` is the only transactional boundary in the system: it
/// spans every decrement of one order plus that order's `pending ->
/// processed` status transition. A single decrement is never committed
/// alone.
#[async_trait]
pub trait FulfillmentStore: InventoryStore + OrderStore {
    /// Applies all decrements and the status transition as one transaction.
    ///
    /// If any decrement misses its version (or would drive stock negative),
    /// the transaction rolls back completely and the outcome reports the
    /// conflict. Fails with `OrderNotFound` when the order is missing.
    async fn commit_processing(
        &self,
        order_id: OrderId,
        decrements: &[StockDecrement],
    ) -> Result<CommitOutcome>;
}

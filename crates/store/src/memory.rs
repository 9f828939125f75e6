use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{Order, OrderId, OrderStatus, ProductId};

use crate::{
    CommitOutcome, FulfillmentStore, InventoryRecord, InventoryStore, OrderStore, Result,
    StockDecrement, StockRequest, StockVersion, StoreError,
};

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    inventory: HashMap<ProductId, InventoryRecord>,
}

/// In-memory fulfillment store for testing and single-process use.
///
/// Orders and inventory live behind one lock, so the processing commit is
/// genuinely atomic: validation of every decrement happens before any
/// mutation, and the status transition lands in the same critical section.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all orders and inventory.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.inventory.clear();
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn get_record(&self, product_id: &ProductId) -> Result<Option<InventoryRecord>> {
        let state = self.state.read().await;
        Ok(state.inventory.get(product_id).cloned())
    }

    async fn upsert_record(&self, record: InventoryRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.inventory.insert(record.product_id.clone(), record);
        Ok(())
    }

    async fn snapshot_versions(
        &self,
        requests: &[StockRequest],
    ) -> Result<HashMap<ProductId, StockVersion>> {
        let state = self.state.read().await;

        let mut versions = HashMap::new();
        let mut insufficient = Vec::new();

        for request in requests {
            match state.inventory.get(&request.product_id) {
                Some(record) if record.quantity >= request.quantity => {
                    versions.insert(request.product_id.clone(), record.version);
                }
                _ => insufficient.push(request.product_id.clone()),
            }
        }

        if !insufficient.is_empty() {
            return Err(StoreError::InsufficientStock {
                product_ids: insufficient,
            });
        }

        Ok(versions)
    }

    async fn decrement(
        &self,
        product_id: &ProductId,
        expected_version: StockVersion,
        quantity: u32,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        let Some(record) = state.inventory.get_mut(product_id) else {
            return Ok(false);
        };

        if record.version != expected_version || record.quantity < quantity {
            return Ok(false);
        }

        record.quantity -= quantity;
        record.version = record.version.next();
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;

        if state.orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateOrder(order.id()));
        }

        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&order_id).cloned())
    }
}

#[async_trait]
impl FulfillmentStore for InMemoryStore {
    async fn commit_processing(
        &self,
        order_id: OrderId,
        decrements: &[StockDecrement],
    ) -> Result<CommitOutcome> {
        let mut state = self.state.write().await;

        if !state.orders.contains_key(&order_id) {
            return Err(StoreError::OrderNotFound(order_id));
        }

        // Validate every decrement before mutating anything, so a late
        // conflict leaves no partial writes behind.
        for decrement in decrements {
            let applies = state
                .inventory
                .get(&decrement.product_id)
                .is_some_and(|record| {
                    record.version == decrement.expected_version
                        && record.quantity >= decrement.quantity
                });

            if !applies {
                return Ok(CommitOutcome::Conflict {
                    product_id: decrement.product_id.clone(),
                });
            }
        }

        for decrement in decrements {
            let record = state
                .inventory
                .get_mut(&decrement.product_id)
                .expect("validated above");
            record.quantity -= decrement.quantity;
            record.version = record.version.next();
        }

        let order = state.orders.get_mut(&order_id).expect("checked above");
        order.set_status(OrderStatus::Processed);

        Ok(CommitOutcome::Committed)
    }
}

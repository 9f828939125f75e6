//! Order creation service.

use std::collections::HashSet;

use common::{Money, Order, OrderId, OrderItem, UserId};
use store::{InventoryStore, OrderStore, StockRequest};

use crate::error::{OrchestratorError, Result};
use crate::events::{EventPublisher, OrderEvent};
use crate::queue::TaskQueue;
use crate::shard::ShardRouter;
use crate::task::ProcessingTask;

/// Synchronous entry point for order creation.
///
/// Validates the request once at the boundary, snapshots inventory versions
/// without locking, persists the order atomically, emits `OrderCreated`,
/// and enqueues the processing task. Insufficient stock aborts before any
/// write.
pub struct OrderService<S, Q, E> {
    store: S,
    queue: Q,
    events: E,
    router: ShardRouter,
}

impl<S, Q, E> OrderService<S, Q, E>
where
    S: OrderStore + InventoryStore,
    Q: TaskQueue,
    E: EventPublisher,
{
    /// Creates a new order service.
    pub fn new(store: S, queue: Q, events: E, router: ShardRouter) -> Self {
        Self {
            store,
            queue,
            events,
            router,
        }
    }

    /// Creates an order for `user_id` with the given items.
    ///
    /// `total_amount` is the caller's claim and must equal the sum of item
    /// totals — the persisted total is never allowed to drift from the
    /// items.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: Vec<OrderItem>,
        total_amount: Money,
    ) -> Result<Order> {
        validate_items(&items, total_amount)?;

        // Version snapshot first: an order that cannot be stocked fails
        // fast, before anything is written.
        let requests: Vec<StockRequest> = items
            .iter()
            .map(|item| StockRequest::new(item.product_id.clone(), item.quantity))
            .collect();
        let inventory_versions = self.store.snapshot_versions(&requests).await?;

        let order_id = OrderId::new();
        let shard_id = self.router.shard_of(order_id);
        let order = Order::new(order_id, user_id, items.clone(), total_amount, shard_id);

        self.store.insert_order(&order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(%order_id, shard_id, "order created");

        // Fire-and-forget: a failed notification must not unwind a
        // persisted order.
        if let Err(e) = self
            .events
            .publish(OrderEvent::OrderCreated {
                order: order.clone(),
            })
            .await
        {
            tracing::warn!(%order_id, error = %e, "failed to publish OrderCreated");
        }

        self.queue
            .enqueue(ProcessingTask::new(order_id, items, inventory_versions))
            .await?;

        Ok(order)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.store.get_order(order_id).await?)
    }
}

/// Validates the fixed-shape line items once at the boundary.
fn validate_items(items: &[OrderItem], total_amount: Money) -> Result<()> {
    if items.is_empty() {
        return Err(OrchestratorError::NoItems);
    }

    let mut seen = HashSet::new();
    for item in items {
        if item.quantity == 0 {
            return Err(OrchestratorError::InvalidQuantity {
                product_id: item.product_id.clone(),
            });
        }
        if item.unit_price.is_negative() {
            return Err(OrchestratorError::InvalidPrice {
                product_id: item.product_id.clone(),
                price: item.unit_price,
            });
        }
        if !seen.insert(item.product_id.clone()) {
            return Err(OrchestratorError::DuplicateProduct {
                product_id: item.product_id.clone(),
            });
        }
    }

    let computed: Money = items.iter().map(|item| item.total_price()).sum();
    if computed != total_amount {
        return Err(OrchestratorError::TotalMismatch {
            supplied: total_amount,
            computed,
        });
    }

    Ok(())
}

//! The queued processing task.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use common::{OrderId, OrderItem, ProductId};
use store::{StockRequest, StockVersion};

/// Queue message scheduling asynchronous processing of one order.
///
/// Carries the inventory versions observed at order-creation time; the
/// worker's conditional decrements check them against current state.
/// Delivery is at-least-once — the worker must tolerate redelivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTask {
    /// The order to process.
    pub order_id: OrderId,

    /// The order's line items.
    pub items: Vec<OrderItem>,

    /// Inventory version per product, captured at creation time.
    pub inventory_versions: HashMap<ProductId, StockVersion>,
}

impl ProcessingTask {
    /// Creates a new processing task.
    pub fn new(
        order_id: OrderId,
        items: Vec<OrderItem>,
        inventory_versions: HashMap<ProductId, StockVersion>,
    ) -> Self {
        Self {
            order_id,
            items,
            inventory_versions,
        }
    }

    /// Returns the stock requirements of this task's items.
    pub fn stock_requests(&self) -> Vec<StockRequest> {
        self.items
            .iter()
            .map(|item| StockRequest::new(item.product_id.clone(), item.quantity))
            .collect()
    }
}

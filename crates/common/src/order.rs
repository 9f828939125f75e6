//! Order and order item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, OrderId, OrderStatus, ProductId, UserId};

/// A line item in an order.
///
/// Immutable once the order is created; persisted together with its order
/// as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product being ordered.
    pub product_id: ProductId,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit at order time.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order placed by a user against the shared inventory pool.
///
/// Created in `pending` status by the orchestrator; the processing worker
/// is the only component that advances it to `processed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    total_amount: Money,
    shard_id: u32,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new pending order.
    pub fn new(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        total_amount: Money,
        shard_id: u32,
    ) -> Self {
        Self {
            id,
            user_id,
            status: OrderStatus::Pending,
            total_amount,
            shard_id,
            items,
            created_at: Utc::now(),
        }
    }

    /// Reconstructs an order from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        total_amount: Money,
        shard_id: u32,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            total_amount,
            shard_id,
            items,
            created_at,
        }
    }

    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the user who placed the order.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the total amount.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the computed shard index.
    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Returns the order items in creation order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns when the order was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the sum of item totals.
    pub fn computed_total(&self) -> Money {
        self.items.iter().map(|item| item.total_price()).sum()
    }

    /// Sets the order status.
    ///
    /// Intended for storage backends applying a committed transition.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<OrderItem> {
        vec![
            OrderItem::new("SKU-001", 2, Money::from_cents(1000)),
            OrderItem::new("SKU-002", 1, Money::from_cents(500)),
        ]
    }

    #[test]
    fn item_total_price() {
        let item = OrderItem::new("SKU-001", 3, Money::from_cents(1000));
        assert_eq!(item.total_price().cents(), 3000);
    }

    #[test]
    fn new_order_is_pending() {
        let order = Order::new(
            OrderId::new(),
            UserId::new(),
            sample_items(),
            Money::from_cents(2500),
            1,
        );

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total_amount().cents(), 2500);
        assert_eq!(order.shard_id(), 1);
    }

    #[test]
    fn computed_total_sums_items() {
        let order = Order::new(
            OrderId::new(),
            UserId::new(),
            sample_items(),
            Money::from_cents(2500),
            0,
        );
        assert_eq!(order.computed_total().cents(), 2500);
    }

    #[test]
    fn set_status_transitions() {
        let mut order = Order::new(
            OrderId::new(),
            UserId::new(),
            sample_items(),
            Money::from_cents(2500),
            0,
        );
        order.set_status(OrderStatus::Processed);
        assert_eq!(order.status(), OrderStatus::Processed);
    }

    #[test]
    fn items_preserve_creation_order() {
        let order = Order::new(
            OrderId::new(),
            UserId::new(),
            sample_items(),
            Money::from_cents(2500),
            0,
        );
        assert_eq!(order.items()[0].product_id.as_str(), "SKU-001");
        assert_eq!(order.items()[1].product_id.as_str(), "SKU-002");
    }

    #[test]
    fn serialization_roundtrip() {
        let order = Order::new(
            OrderId::new(),
            UserId::new(),
            sample_items(),
            Money::from_cents(2500),
            3,
        );
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}

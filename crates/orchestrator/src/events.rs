//! Typed domain events and the publisher seam.
//!
//! Emission contract: `OrderCreated` is published synchronously at the end
//! of order creation, `OrderShipped` exactly once after a processing commit
//! is durable. Both are at-least-once; `OrderCreated` always precedes any
//! `OrderShipped` for the same order. Downstream consumers (confirmation
//! mail, the shipping department) live outside this system.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::{Order, OrderId};

/// Events emitted by the fulfillment core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// An order was created and persisted.
    OrderCreated {
        /// The persisted order with items attached.
        order: Order,
    },

    /// An order's inventory was committed and the order is ready to ship.
    OrderShipped {
        /// The processed order.
        order_id: OrderId,
    },
}

impl OrderEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated { .. } => "OrderCreated",
            OrderEvent::OrderShipped { .. } => "OrderShipped",
        }
    }

    /// Returns the order this event concerns.
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderCreated { order } => order.id(),
            OrderEvent::OrderShipped { order_id } => *order_id,
        }
    }
}

/// Error returned when an event could not be handed to the publisher.
#[derive(Debug, Error)]
#[error("Failed to publish {event_type}: {reason}")]
pub struct PublishError {
    pub event_type: &'static str,
    pub reason: String,
}

/// Trait for event publication.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event. Delivery downstream is fire-and-forget;
    /// publishing only guarantees the emission contract.
    async fn publish(&self, event: OrderEvent) -> Result<(), PublishError>;
}

/// In-memory event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<RwLock<Vec<OrderEvent>>>,
    fail_next: Arc<RwLock<bool>>,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory event publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail the next publish call.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    /// Returns all published events in emission order.
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.read().unwrap().clone()
    }

    /// Returns the number of `OrderCreated` events.
    pub fn created_count(&self) -> usize {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, OrderEvent::OrderCreated { .. }))
            .count()
    }

    /// Returns the number of `OrderShipped` events.
    pub fn shipped_count(&self) -> usize {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, OrderEvent::OrderShipped { .. }))
            .count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: OrderEvent) -> Result<(), PublishError> {
        if std::mem::take(&mut *self.fail_next.write().unwrap()) {
            return Err(PublishError {
                event_type: event.event_type(),
                reason: "publisher configured to fail".to_string(),
            });
        }

        self.events.write().unwrap().push(event);
        Ok(())
    }
}

/// Publisher that logs events through tracing.
///
/// Stands in for the out-of-scope notification consumers in the default
/// wiring: emission is observable, delivery is nobody's promise.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: OrderEvent) -> Result<(), PublishError> {
        tracing::info!(
            event_type = event.event_type(),
            order_id = %event.order_id(),
            "event published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, OrderItem, UserId};

    fn sample_order() -> Order {
        Order::new(
            OrderId::new(),
            UserId::new(),
            vec![OrderItem::new("SKU-001", 1, Money::from_cents(100))],
            Money::from_cents(100),
            0,
        )
    }

    #[tokio::test]
    async fn publisher_records_in_emission_order() {
        let publisher = InMemoryEventPublisher::new();
        let order = sample_order();
        let order_id = order.id();

        publisher
            .publish(OrderEvent::OrderCreated { order })
            .await
            .unwrap();
        publisher
            .publish(OrderEvent::OrderShipped { order_id })
            .await
            .unwrap();

        let events = publisher.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "OrderCreated");
        assert_eq!(events[1].event_type(), "OrderShipped");
        assert_eq!(publisher.created_count(), 1);
        assert_eq!(publisher.shipped_count(), 1);
    }

    #[tokio::test]
    async fn fail_next_rejects_one_publish() {
        let publisher = InMemoryEventPublisher::new();
        publisher.set_fail_next(true);

        let order_id = OrderId::new();
        let result = publisher
            .publish(OrderEvent::OrderShipped { order_id })
            .await;
        assert!(result.is_err());

        // Subsequent publishes succeed again
        publisher
            .publish(OrderEvent::OrderShipped { order_id })
            .await
            .unwrap();
        assert_eq!(publisher.shipped_count(), 1);
    }

    #[test]
    fn event_serialization_is_tagged() {
        let event = OrderEvent::OrderShipped {
            order_id: OrderId::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "OrderShipped");
        assert!(json["data"]["order_id"].is_string());
    }
}

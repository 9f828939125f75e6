//! The per-task order processor.

use std::time::Instant;

use lock::{DistributedLock, LockConfig, LockStore};
use orchestrator::{EventPublisher, OrderEvent, ProcessingTask};
use store::{CommitOutcome, FulfillmentStore, StockDecrement};

use crate::config::WorkerConfig;
use crate::state::{ProcessingOutcome, ProcessingState, RescheduleReason};

/// Processes one order task at a time: lock, atomic commit, event, release.
///
/// `process` never blocks on contention. Every early exit is an explicit
/// reschedule outcome carrying its delay; the runner turns those into
/// delayed redeliveries.
pub struct OrderProcessor<S, L: LockStore, E> {
    store: S,
    lock: DistributedLock<L>,
    events: E,
    config: WorkerConfig,
}

impl<S, L, E> OrderProcessor<S, L, E>
where
    S: FulfillmentStore,
    L: LockStore,
    E: EventPublisher,
{
    /// Creates a new processor.
    pub fn new(store: S, lock_store: L, events: E, config: WorkerConfig) -> Self {
        let lock = DistributedLock::new(
            lock_store,
            LockConfig {
                default_ttl: config.lock_ttl,
            },
        );
        Self {
            store,
            lock,
            events,
            config,
        }
    }

    /// Runs one processing attempt for the task.
    #[tracing::instrument(skip(self, task), fields(order_id = %task.order_id))]
    pub async fn process(&self, task: &ProcessingTask) -> ProcessingOutcome {
        let started = Instant::now();
        metrics::counter!("order_processing_attempts_total").increment(1);

        let mut state = ProcessingState::Pending;
        debug_assert!(state.can_lock());

        state = ProcessingState::Locking;
        tracing::debug!(state = %state, "acquiring order lock");

        let resource = format!("order:{}", task.order_id);
        let token = match self.lock.acquire(&resource).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                // Another worker owns this order right now. Nothing was
                // touched and nothing needs releasing.
                metrics::counter!("order_processing_lock_busy_total").increment(1);
                tracing::info!("order lock busy, rescheduling");
                return self.reschedule(RescheduleReason::LockBusy);
            }
            Err(e) => {
                tracing::warn!(error = %e, "lock store unavailable, rescheduling");
                return self.reschedule(RescheduleReason::Fault);
            }
        };

        debug_assert!(state.can_decrement());
        state = ProcessingState::Decrementing;
        tracing::debug!(state = %state, "applying inventory decrements");

        let outcome = self.commit(task).await;

        // Runs on every path out of the critical section. A failed release
        // is only logged; the TTL reclaims the entry.
        if let Err(e) = self.lock.release(&resource, &token).await {
            tracing::warn!(error = %e, "failed to release order lock");
        }

        if outcome == ProcessingOutcome::Processed {
            state = ProcessingState::Processed;
            metrics::histogram!("order_processing_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            tracing::info!(state = %state, "order processed");
        }

        outcome
    }

    /// Builds the decrement batch and commits it with the status transition.
    async fn commit(&self, task: &ProcessingTask) -> ProcessingOutcome {
        let mut decrements = Vec::with_capacity(task.items.len());
        for item in &task.items {
            let Some(version) = task.inventory_versions.get(&item.product_id) else {
                tracing::error!(
                    product_id = %item.product_id,
                    "task carries no version snapshot for product"
                );
                return self.reschedule(RescheduleReason::Fault);
            };
            decrements.push(StockDecrement::new(
                item.product_id.clone(),
                *version,
                item.quantity,
            ));
        }

        match self
            .store
            .commit_processing(task.order_id, &decrements)
            .await
        {
            Ok(CommitOutcome::Committed) => {
                metrics::counter!("orders_processed_total").increment(1);

                // The commit is durable; emit the shipment event exactly
                // once. A failed publish must not reschedule — the
                // decrements are applied, so a retry could only conflict.
                if let Err(e) = self
                    .events
                    .publish(OrderEvent::OrderShipped {
                        order_id: task.order_id,
                    })
                    .await
                {
                    tracing::error!(error = %e, "failed to publish OrderShipped after commit");
                }

                ProcessingOutcome::Processed
            }
            Ok(CommitOutcome::Conflict { product_id }) => {
                metrics::counter!("order_processing_conflicts_total").increment(1);
                tracing::warn!(%product_id, "inventory version conflict, rescheduling");
                self.reschedule(RescheduleReason::InventoryConflict)
            }
            Err(e) => {
                tracing::error!(error = %e, "order processing failed, rescheduling");
                self.reschedule(RescheduleReason::Fault)
            }
        }
    }

    fn reschedule(&self, reason: RescheduleReason) -> ProcessingOutcome {
        ProcessingOutcome::Rescheduled {
            reason,
            delay: reason.delay(&self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use common::{Money, Order, OrderId, OrderItem, OrderStatus, ProductId, UserId};
    use lock::InMemoryLockStore;
    use orchestrator::InMemoryEventPublisher;
    use store::{InMemoryStore, InventoryRecord, InventoryStore, OrderStore, StockVersion};

    use super::*;

    type TestProcessor = OrderProcessor<InMemoryStore, InMemoryLockStore, InMemoryEventPublisher>;

    struct Fixture {
        processor: TestProcessor,
        store: InMemoryStore,
        lock_store: InMemoryLockStore,
        events: InMemoryEventPublisher,
    }

    async fn setup() -> Fixture {
        let store = InMemoryStore::new();
        store
            .upsert_record(InventoryRecord::new("SKU-001", 10))
            .await
            .unwrap();
        store
            .upsert_record(InventoryRecord::new("SKU-002", 5))
            .await
            .unwrap();

        let lock_store = InMemoryLockStore::new();
        let events = InMemoryEventPublisher::new();
        let processor = OrderProcessor::new(
            store.clone(),
            lock_store.clone(),
            events.clone(),
            WorkerConfig::default(),
        );

        Fixture {
            processor,
            store,
            lock_store,
            events,
        }
    }

    /// Persists a pending order and returns the matching task.
    async fn order_task(store: &InMemoryStore, items: Vec<OrderItem>) -> ProcessingTask {
        let total = items.iter().map(|i| i.total_price()).sum();
        let order = Order::new(OrderId::new(), UserId::new(), items.clone(), total, 0);
        store.insert_order(&order).await.unwrap();

        let mut versions = HashMap::new();
        for item in &items {
            let record = store.get_record(&item.product_id).await.unwrap().unwrap();
            versions.insert(item.product_id.clone(), record.version);
        }

        ProcessingTask::new(order.id(), items, versions)
    }

    #[tokio::test]
    async fn happy_path_commits_and_ships() {
        let fx = setup().await;
        let task = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))],
        )
        .await;

        let outcome = fx.processor.process(&task).await;
        assert_eq!(outcome, ProcessingOutcome::Processed);

        let record = fx
            .store
            .get_record(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 8);
        assert_eq!(record.version, StockVersion::new(2));

        let order = fx.store.get_order(task.order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Processed);

        assert_eq!(fx.events.shipped_count(), 1);
    }

    #[tokio::test]
    async fn lock_busy_reschedules_without_touching_inventory() {
        let fx = setup().await;
        let task = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))],
        )
        .await;

        // Another worker holds this order's lock.
        let other = DistributedLock::with_defaults(fx.lock_store.clone());
        let resource = format!("order:{}", task.order_id);
        let held = other.acquire(&resource).await.unwrap().unwrap();

        let outcome = fx.processor.process(&task).await;
        assert_eq!(
            outcome,
            ProcessingOutcome::Rescheduled {
                reason: RescheduleReason::LockBusy,
                delay: Duration::from_secs(30),
            }
        );

        // Zero inventory mutations, no shipment, order still pending.
        let record = fx
            .store
            .get_record(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 10);
        assert_eq!(record.version, StockVersion::first());
        assert_eq!(fx.events.shipped_count(), 0);

        let order = fx.store.get_order(task.order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);

        // The loser never called release: the holder's token still works.
        assert!(other.release(&resource, &held).await.unwrap());
    }

    #[tokio::test]
    async fn version_conflict_reschedules_with_longer_delay() {
        let fx = setup().await;
        let mut task = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))],
        )
        .await;

        // Another order won this product's version race in the meantime.
        task.inventory_versions
            .insert(ProductId::new("SKU-001"), StockVersion::new(99));

        let outcome = fx.processor.process(&task).await;
        assert_eq!(
            outcome,
            ProcessingOutcome::Rescheduled {
                reason: RescheduleReason::InventoryConflict,
                delay: Duration::from_secs(60),
            }
        );

        let record = fx
            .store
            .get_record(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 10);
        assert_eq!(fx.events.shipped_count(), 0);
    }

    #[tokio::test]
    async fn conflict_rolls_back_every_decrement() {
        let fx = setup().await;
        let mut task = order_task(
            &fx.store,
            vec![
                OrderItem::new("SKU-001", 2, Money::from_cents(1000)),
                OrderItem::new("SKU-002", 1, Money::from_cents(500)),
            ],
        )
        .await;

        task.inventory_versions
            .insert(ProductId::new("SKU-002"), StockVersion::new(99));

        let outcome = fx.processor.process(&task).await;
        assert!(matches!(
            outcome,
            ProcessingOutcome::Rescheduled {
                reason: RescheduleReason::InventoryConflict,
                ..
            }
        ));

        // The first product's decrement must not stick.
        let sku1 = fx
            .store
            .get_record(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sku1.quantity, 10);
        assert_eq!(sku1.version, StockVersion::first());
    }

    #[tokio::test]
    async fn lock_released_after_success_and_after_conflict() {
        let fx = setup().await;
        let task = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))],
        )
        .await;
        let resource = format!("order:{}", task.order_id);
        let probe = DistributedLock::with_defaults(fx.lock_store.clone());

        // Success path releases.
        fx.processor.process(&task).await;
        let token = probe.acquire(&resource).await.unwrap();
        assert!(token.is_some());
        probe.release(&resource, &token.unwrap()).await.unwrap();

        // Conflict path releases too (versions have advanced by now).
        let outcome = fx.processor.process(&task).await;
        assert!(matches!(outcome, ProcessingOutcome::Rescheduled { .. }));
        assert!(probe.acquire(&resource).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_order_is_a_fault() {
        let fx = setup().await;

        // Task for an order that was never persisted.
        let task = ProcessingTask::new(
            OrderId::new(),
            vec![OrderItem::new("SKU-001", 1, Money::from_cents(100))],
            HashMap::from([(ProductId::new("SKU-001"), StockVersion::first())]),
        );

        let outcome = fx.processor.process(&task).await;
        assert_eq!(
            outcome,
            ProcessingOutcome::Rescheduled {
                reason: RescheduleReason::Fault,
                delay: Duration::from_secs(60),
            }
        );
    }

    #[tokio::test]
    async fn missing_version_snapshot_is_a_fault() {
        let fx = setup().await;
        let mut task = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 1, Money::from_cents(100))],
        )
        .await;
        task.inventory_versions.clear();

        let outcome = fx.processor.process(&task).await;
        assert!(matches!(
            outcome,
            ProcessingOutcome::Rescheduled {
                reason: RescheduleReason::Fault,
                ..
            }
        ));

        // No inventory was touched.
        let record = fx
            .store
            .get_record(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 10);
    }

    #[tokio::test]
    async fn redelivery_after_commit_does_not_ship_twice() {
        let fx = setup().await;
        let task = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))],
        )
        .await;

        assert_eq!(fx.processor.process(&task).await, ProcessingOutcome::Processed);

        // At-least-once delivery: the same task comes back. Its snapshot is
        // now stale, so the attempt conflicts instead of double-selling.
        let outcome = fx.processor.process(&task).await;
        assert!(matches!(
            outcome,
            ProcessingOutcome::Rescheduled {
                reason: RescheduleReason::InventoryConflict,
                ..
            }
        ));

        assert_eq!(fx.events.shipped_count(), 1);
        let record = fx
            .store
            .get_record(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.quantity, 8);
    }

    #[tokio::test]
    async fn publish_failure_after_commit_still_reports_processed() {
        let fx = setup().await;
        let task = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))],
        )
        .await;

        fx.events.set_fail_next(true);

        let outcome = fx.processor.process(&task).await;
        assert_eq!(outcome, ProcessingOutcome::Processed);

        let order = fx.store.get_order(task.order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Processed);
        assert_eq!(fx.events.shipped_count(), 0);
    }

    #[tokio::test]
    async fn two_orders_racing_one_version_have_single_winner() {
        let fx = setup().await;

        // Both orders captured version 1 of the same product.
        let task_a = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))],
        )
        .await;
        let task_b = order_task(
            &fx.store,
            vec![OrderItem::new("SKU-001", 3, Money::from_cents(1000))],
        )
        .await;

        let processor = std::sync::Arc::new(fx.processor);
        let p1 = processor.clone();
        let p2 = processor.clone();
        let t1 = task_a.clone();
        let t2 = task_b.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { p1.process(&t1).await }),
            tokio::spawn(async move { p2.process(&t2).await }),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let processed = outcomes
            .iter()
            .filter(|o| **o == ProcessingOutcome::Processed)
            .count();
        let rescheduled = outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    ProcessingOutcome::Rescheduled {
                        reason: RescheduleReason::InventoryConflict,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(processed, 1);
        assert_eq!(rescheduled, 1);

        // Inventory reflects only the winner: 10 - 2 or 10 - 3.
        let record = fx
            .store
            .get_record(&ProductId::new("SKU-001"))
            .await
            .unwrap()
            .unwrap();
        assert!(record.quantity == 8 || record.quantity == 7);
        assert_eq!(record.version, StockVersion::new(2));
        assert_eq!(fx.events.shipped_count(), 1);
    }
}

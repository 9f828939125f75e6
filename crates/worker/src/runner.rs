//! Queue consume loop.

use std::sync::Arc;

use lock::LockStore;
use orchestrator::{EventPublisher, TaskQueue};
use store::FulfillmentStore;
use tokio::sync::watch;

use crate::processor::OrderProcessor;
use crate::state::ProcessingOutcome;

/// Drives an [`OrderProcessor`] from a task queue until shutdown.
///
/// Rescheduled tasks go back into the queue with the delay their outcome
/// carries. There is no retry bound: a task that keeps conflicting keeps
/// coming back.
pub struct WorkerRunner<S, L: LockStore, Q, E> {
    processor: Arc<OrderProcessor<S, L, E>>,
    queue: Q,
}

impl<S, L, Q, E> WorkerRunner<S, L, Q, E>
where
    S: FulfillmentStore,
    L: LockStore,
    Q: TaskQueue,
    E: EventPublisher,
{
    /// Creates a runner over the given processor and queue.
    pub fn new(processor: Arc<OrderProcessor<S, L, E>>, queue: Q) -> Self {
        Self { processor, queue }
    }

    /// Consumes tasks until the shutdown signal fires or the queue closes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("worker runner started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("worker runner shutting down");
                    break;
                }
                task = self.queue.pop() => {
                    let Some(task) = task else {
                        tracing::info!("task queue closed, worker runner stopping");
                        break;
                    };

                    match self.processor.process(&task).await {
                        ProcessingOutcome::Processed => {}
                        ProcessingOutcome::Rescheduled { reason, delay } => {
                            tracing::debug!(
                                order_id = %task.order_id,
                                %reason,
                                delay_secs = delay.as_secs_f64(),
                                "rescheduling task"
                            );
                            if let Err(e) = self.queue.enqueue_after(task, delay).await {
                                tracing::error!(error = %e, "failed to reschedule task");
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use common::{Money, Order, OrderId, OrderItem, OrderStatus, UserId};
    use lock::{DistributedLock, InMemoryLockStore};
    use orchestrator::{InMemoryEventPublisher, InMemoryTaskQueue, ProcessingTask};
    use store::{InMemoryStore, InventoryRecord, InventoryStore, OrderStore};

    use super::*;
    use crate::WorkerConfig;

    /// Config with tiny delays so reschedule loops resolve within the test.
    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            lock_ttl: Duration::from_secs(30),
            lock_busy_delay: Duration::from_millis(10),
            conflict_retry_delay: Duration::from_millis(10),
        }
    }

    async fn seeded_task(store: &InMemoryStore) -> ProcessingTask {
        store
            .upsert_record(InventoryRecord::new("SKU-001", 10))
            .await
            .unwrap();

        let items = vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))];
        let order = Order::new(
            OrderId::new(),
            UserId::new(),
            items.clone(),
            Money::from_cents(2000),
            0,
        );
        store.insert_order(&order).await.unwrap();

        let record = store
            .get_record(&items[0].product_id)
            .await
            .unwrap()
            .unwrap();
        ProcessingTask::new(
            order.id(),
            items.clone(),
            HashMap::from([(items[0].product_id.clone(), record.version)]),
        )
    }

    async fn wait_for_status(store: &InMemoryStore, order_id: OrderId, status: OrderStatus) {
        for _ in 0..100 {
            if let Some(order) = store.get_order(order_id).await.unwrap()
                && order.status() == status
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("order never reached {status}");
    }

    #[tokio::test]
    async fn runner_processes_enqueued_task() {
        let store = InMemoryStore::new();
        let task = seeded_task(&store).await;
        let order_id = task.order_id;

        let queue = InMemoryTaskQueue::new();
        queue.enqueue(task).await.unwrap();

        let processor = Arc::new(OrderProcessor::new(
            store.clone(),
            InMemoryLockStore::new(),
            InMemoryEventPublisher::new(),
            fast_config(),
        ));
        let runner = WorkerRunner::new(processor, queue.clone());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        wait_for_status(&store, order_id, OrderStatus::Processed).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn runner_redelivers_until_lock_frees() {
        let store = InMemoryStore::new();
        let task = seeded_task(&store).await;
        let order_id = task.order_id;

        let lock_store = InMemoryLockStore::new();

        // Hold the order's lock so the first deliveries bounce.
        let other = DistributedLock::with_defaults(lock_store.clone());
        let resource = format!("order:{order_id}");
        let held = other.acquire(&resource).await.unwrap().unwrap();

        let queue = InMemoryTaskQueue::new();
        queue.enqueue(task).await.unwrap();

        let processor = Arc::new(OrderProcessor::new(
            store.clone(),
            lock_store,
            InMemoryEventPublisher::new(),
            fast_config(),
        ));
        let runner = WorkerRunner::new(processor, queue.clone());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        // Let a few lock-busy bounces happen, then free the lock.
        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let order = store.get_order(order_id).await.unwrap().unwrap();
            assert_eq!(order.status(), OrderStatus::Pending);
        }
        other.release(&resource, &held).await.unwrap();

        wait_for_status(&store, order_id, OrderStatus::Processed).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_runner() {
        let store = InMemoryStore::new();
        let queue = InMemoryTaskQueue::new();
        let processor = Arc::new(OrderProcessor::new(
            store,
            InMemoryLockStore::new(),
            InMemoryEventPublisher::new(),
            fast_config(),
        ));
        let runner = WorkerRunner::new(processor, queue);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("runner should stop on shutdown")
            .unwrap();
    }
}

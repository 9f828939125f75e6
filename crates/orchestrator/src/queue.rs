//! Task queue seam and in-memory implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

use crate::ProcessingTask;

/// Error returned when the queue cannot accept or deliver tasks.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has shut down.
    #[error("Task queue is closed")]
    Closed,
}

/// Trait for the processing task queue.
///
/// Delivery is at-least-once. Delayed enqueues are how the system backs off:
/// the worker never sleeps in-process, it reschedules the task and moves on.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues a task for immediate delivery.
    async fn enqueue(&self, task: ProcessingTask) -> Result<(), QueueError>;

    /// Enqueues a task to be delivered after `delay`.
    async fn enqueue_after(&self, task: ProcessingTask, delay: Duration) -> Result<(), QueueError>;

    /// Waits for the next task. Returns None once the queue is closed and
    /// drained.
    async fn pop(&self) -> Option<ProcessingTask>;
}

/// In-memory task queue backed by an unbounded channel.
///
/// Delayed tasks are held by a timer task and re-sent when their delay
/// elapses; ordering between delayed and immediate tasks follows delivery
/// time, not enqueue time.
#[derive(Clone)]
pub struct InMemoryTaskQueue {
    tx: mpsc::UnboundedSender<ProcessingTask>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<ProcessingTask>>>,
}

impl InMemoryTaskQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Takes the next task if one is already deliverable, without waiting.
    pub async fn try_pop(&self) -> Option<ProcessingTask> {
        self.rx.lock().await.try_recv().ok()
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: ProcessingTask) -> Result<(), QueueError> {
        self.tx.send(task).map_err(|_| QueueError::Closed)
    }

    async fn enqueue_after(&self, task: ProcessingTask, delay: Duration) -> Result<(), QueueError> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the system is shutting down; the task is
            // dropped with it.
            let _ = tx.send(task);
        });
        Ok(())
    }

    async fn pop(&self) -> Option<ProcessingTask> {
        self.rx.lock().await.recv().await
    }
}

//! Order creation orchestration.
//!
//! The orchestrator is the synchronous entry point of the system: it
//! validates the requested items once at the boundary, snapshots inventory
//! versions without taking any lock, persists the order atomically, emits
//! the `OrderCreated` event, and enqueues the asynchronous processing task
//! carrying the version snapshot.
//!
//! The snapshot may be stale by the time the worker runs — that is the
//! design: the worker's version-conditioned decrements re-validate freshness
//! at commit time.

pub mod error;
pub mod events;
pub mod queue;
pub mod service;
pub mod shard;
pub mod task;

pub use error::{OrchestratorError, Result};
pub use events::{
    EventPublisher, InMemoryEventPublisher, OrderEvent, PublishError, TracingEventPublisher,
};
pub use queue::{InMemoryTaskQueue, QueueError, TaskQueue};
pub use service::OrderService;
pub use shard::ShardRouter;
pub use task::ProcessingTask;

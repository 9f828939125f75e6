//! Asynchronous order processing.
//!
//! Workers consume processing tasks from a shared queue. For each task the
//! worker takes the per-order lock, applies every inventory decrement plus
//! the order's status transition as one atomic commit, emits `OrderShipped`,
//! and releases the lock on every exit path. Contention never blocks a
//! worker: a busy lock or a version conflict reschedules the task with a
//! fixed delay and the worker moves on.
//!
//! The per-order lock serializes workers on the *same* order. Different
//! orders touching the same product race at the storage layer instead, where
//! the version-conditioned decrement picks exactly one winner per version.

pub mod config;
pub mod processor;
pub mod runner;
pub mod state;

pub use config::WorkerConfig;
pub use processor::OrderProcessor;
pub use runner::WorkerRunner;
pub use state::{ProcessingOutcome, ProcessingState, RescheduleReason};

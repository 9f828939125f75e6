//! Processing state machine.

use std::time::Duration;

use crate::WorkerConfig;

/// The state of one processing attempt.
///
/// State transitions:
/// ```text
/// Pending ──► Locking ──► Decrementing ──► Processed
///                │             │
///    (lock busy) │             │ (conflict / fault)
///                ▼             ▼
///             Pending       Pending      (via rescheduled redelivery)
/// ```
///
/// Every redelivery starts a fresh attempt from `Pending`; nothing about an
/// attempt survives except the task itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessingState {
    /// Task delivered, attempt not started.
    #[default]
    Pending,

    /// Acquiring the per-order lock.
    Locking,

    /// Lock held; applying the atomic decrement batch.
    Decrementing,

    /// Commit durable and `OrderShipped` emitted (terminal state).
    Processed,
}

impl ProcessingState {
    /// Returns true if the attempt can move to lock acquisition.
    pub fn can_lock(&self) -> bool {
        matches!(self, ProcessingState::Pending)
    }

    /// Returns true if the attempt can enter the critical section.
    pub fn can_decrement(&self) -> bool {
        matches!(self, ProcessingState::Locking)
    }

    /// Returns true if this is the terminal success state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Processed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "Pending",
            ProcessingState::Locking => "Locking",
            ProcessingState::Decrementing => "Decrementing",
            ProcessingState::Processed => "Processed",
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an attempt was sent back to `Pending`.
///
/// Each reason carries its reschedule delay as first-class transition
/// metadata — the worker never sleeps in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RescheduleReason {
    /// Another worker holds the per-order lock. Nothing was attempted, so
    /// the retry comes back quickly.
    LockBusy,

    /// A version-conditioned decrement missed; the whole transaction rolled
    /// back.
    InventoryConflict,

    /// Any other fault inside the attempt.
    Fault,
}

impl RescheduleReason {
    /// Returns the reschedule delay this transition carries.
    pub fn delay(&self, config: &WorkerConfig) -> Duration {
        match self {
            RescheduleReason::LockBusy => config.lock_busy_delay,
            RescheduleReason::InventoryConflict | RescheduleReason::Fault => {
                config.conflict_retry_delay
            }
        }
    }

    /// Returns the reason name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RescheduleReason::LockBusy => "lock_busy",
            RescheduleReason::InventoryConflict => "inventory_conflict",
            RescheduleReason::Fault => "fault",
        }
    }
}

impl std::fmt::Display for RescheduleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of one processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The order was committed and is ready to ship.
    Processed,

    /// The attempt ended early; the task should be redelivered after
    /// `delay`.
    Rescheduled {
        reason: RescheduleReason,
        delay: Duration,
    },
}

//! Worker configuration.

use std::time::Duration;

/// Timing configuration for the processing worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// TTL for the per-order lock. There is no renewal: an attempt that
    /// outlives this loses exclusivity to the next acquirer.
    pub lock_ttl: Duration,

    /// Reschedule delay when the per-order lock is already held.
    pub lock_busy_delay: Duration,

    /// Reschedule delay after an inventory conflict or unexpected fault.
    pub conflict_retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(30),
            lock_busy_delay: Duration::from_secs(30),
            conflict_retry_delay: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = WorkerConfig::default();
        assert_eq!(config.lock_ttl, Duration::from_secs(30));
        assert_eq!(config.lock_busy_delay, Duration::from_secs(30));
        assert_eq!(config.conflict_retry_delay, Duration::from_secs(60));
    }
}

//! Queue counters.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::{now_utc, Timestamp};

/// Metrics for queue monitoring.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    /// Records accepted into the buffer.
    enqueued: AtomicU64,
    /// Enqueue calls refused (full or closed).
    rejected: AtomicU64,
    /// Tasks that reached the Sink successfully.
    succeeded: AtomicU64,
    /// Failed attempts that were rescheduled.
    retried: AtomicU64,
    /// Tasks finalized as failed.
    failed: AtomicU64,
    /// Sink invocations.
    sink_calls: AtomicU64,
    /// Last successful write.
    last_success: RwLock<Option<Timestamp>>,
    /// Last final failure.
    last_failure: RwLock<Option<Timestamp>>,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Records accepted into the buffer.
    pub enqueued: u64,
    /// Enqueue calls refused.
    pub rejected: u64,
    /// Tasks completed successfully.
    pub succeeded: u64,
    /// Attempts rescheduled after a failure.
    pub retried: u64,
    /// Tasks finalized as failed.
    pub failed: u64,
    /// Sink invocations.
    pub sink_calls: u64,
    /// Tasks waiting, including those in a retry delay.
    pub pending: usize,
    /// Tasks currently handed to the Sink (0 or 1).
    pub in_flight: usize,
    /// Last successful write.
    pub last_success: Option<Timestamp>,
    /// Last final failure.
    pub last_failure: Option<Timestamp>,
}

impl QueueMetrics {
    /// Records an accepted enqueue.
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a refused enqueue.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a Sink invocation.
    pub fn record_sink_call(&self) {
        self.sink_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful task.
    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        *self.last_success.write() = Some(now_utc());
    }

    /// Records a rescheduled attempt.
    pub fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task finalized as failed.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.write() = Some(now_utc());
    }

    /// Returns the number of accepted enqueues.
    #[must_use]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Returns the number of refused enqueues.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Returns the number of successful tasks.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Returns the number of rescheduled attempts.
    #[must_use]
    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::Relaxed)
    }

    /// Returns the number of tasks finalized as failed.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Returns the number of Sink invocations.
    #[must_use]
    pub fn sink_calls(&self) -> u64 {
        self.sink_calls.load(Ordering::Relaxed)
    }

    /// Builds a snapshot with the given buffer occupancy.
    #[must_use]
    pub fn snapshot(&self, pending: usize, in_flight: usize) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued(),
            rejected: self.rejected(),
            succeeded: self.succeeded(),
            retried: self.retried(),
            failed: self.failed(),
            sink_calls: self.sink_calls(),
            pending,
            in_flight,
            last_success: *self.last_success.read(),
            last_failure: *self.last_failure.read(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_default() {
        let metrics = QueueMetrics::default();
        assert_eq!(metrics.enqueued(), 0);
        assert_eq!(metrics.failed(), 0);
        assert_eq!(metrics.snapshot(0, 0).last_success, None);
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = QueueMetrics::default();
        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_rejected();
        metrics.record_sink_call();
        metrics.record_sink_call();
        metrics.record_retry();
        metrics.record_success();

        let stats = metrics.snapshot(1, 0);
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.sink_calls, 2);
        assert_eq!(stats.retried, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.pending, 1);
        assert!(stats.last_success.is_some());
        assert!(stats.last_failure.is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = QueueMetrics::default();
        metrics.record_failure();

        let json = serde_json::to_value(metrics.snapshot(0, 1)).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["in_flight"], 1);
        assert!(json["last_failure"].is_string());
    }
}

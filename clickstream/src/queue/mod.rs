//! The ingestion queue and its retry machinery.
//!
//! Two retry layers live here. The queue worker retries failed Sink writes
//! per [`QueueConfig::retry`]; [`EventQueue::enqueue_with_retry`] is a
//! coarser producer-side layer that only retries refused enqueues.

mod config;
mod handle;
mod metrics;
mod retry;
mod task_queue;

pub use config::QueueConfig;
pub use handle::{TaskHandle, TaskOutcome};
pub use metrics::{QueueMetrics, QueueStats};
pub use retry::{
    should_retry, with_retry, BackoffStrategy, JitterStrategy, RetryDecision, RetryPolicy,
};
pub use task_queue::EventQueue;

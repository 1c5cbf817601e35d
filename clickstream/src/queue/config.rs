//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::RetryPolicy;

/// Configuration for an [`EventQueue`](super::EventQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Policy applied to failed Sink writes.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Maximum pending tasks; `None` leaves the buffer unbounded.
    #[serde(default = "default_capacity")]
    pub capacity: Option<usize>,
    /// Per-call Sink timeout in milliseconds; `None` waits indefinitely.
    #[serde(default = "default_sink_timeout_ms")]
    pub sink_timeout_ms: Option<u64>,
}

#[allow(clippy::unnecessary_wraps)]
fn default_capacity() -> Option<usize> {
    Some(10_000)
}

#[allow(clippy::unnecessary_wraps)]
fn default_sink_timeout_ms() -> Option<u64> {
    Some(10_000)
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            capacity: default_capacity(),
            sink_timeout_ms: default_sink_timeout_ms(),
        }
    }
}

impl QueueConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bounds the pending buffer.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Removes the buffer bound.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.capacity = None;
        self
    }

    /// Sets the per-call Sink timeout.
    #[must_use]
    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Lets Sink calls run without a time limit.
    #[must_use]
    pub fn without_sink_timeout(mut self) -> Self {
        self.sink_timeout_ms = None;
        self
    }

    /// The per-call Sink timeout, if any.
    #[must_use]
    pub fn sink_timeout(&self) -> Option<Duration> {
        self.sink_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.capacity, Some(10_000));
        assert_eq!(config.sink_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_builder() {
        let config = QueueConfig::new()
            .with_capacity(5)
            .with_sink_timeout(Duration::from_millis(250))
            .with_retry(RetryPolicy::new().with_max_attempts(5));

        assert_eq!(config.capacity, Some(5));
        assert_eq!(config.sink_timeout_ms, Some(250));
        assert_eq!(config.retry.max_attempts, 5);

        let config = config.unbounded().without_sink_timeout();
        assert_eq!(config.capacity, None);
        assert_eq!(config.sink_timeout(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"retry": {"max_attempts": 4}}"#).unwrap();
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.capacity, Some(10_000));
    }
}

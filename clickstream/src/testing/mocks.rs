//! Mock sinks for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::core::EventRecord;
use crate::errors::SinkError;
use crate::events::EventSink;

/// Shared bookkeeping: every attempted element plus every accepted record.
#[derive(Debug, Default)]
struct CallLog {
    attempted: Mutex<Vec<String>>,
    writes: Mutex<Vec<EventRecord>>,
}

impl CallLog {
    fn attempt(&self, record: &EventRecord) -> usize {
        let mut attempted = self.attempted.lock();
        attempted.push(record.element().to_string());
        attempted.len()
    }

    fn accept(&self, record: &EventRecord) {
        self.writes.lock().push(record.clone());
    }

    fn call_count(&self) -> usize {
        self.attempted.lock().len()
    }

    fn attempted(&self) -> Vec<String> {
        self.attempted.lock().clone()
    }

    fn writes(&self) -> Vec<EventRecord> {
        self.writes.lock().clone()
    }
}

/// A sink that accepts everything and keeps what it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    log: CallLog,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of write calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log.call_count()
    }

    /// Returns the accepted records in write order.
    #[must_use]
    pub fn writes(&self) -> Vec<EventRecord> {
        self.log.writes()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.log.attempt(record);
        self.log.accept(record);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// A sink that fails a fixed number of times before accepting.
#[derive(Debug, Default)]
pub struct FlakySink {
    /// Only records with this element fail; `None` fails any record.
    target: Option<String>,
    remaining_failures: Mutex<usize>,
    log: CallLog,
}

impl FlakySink {
    /// Fails the first `failures` calls, whatever the record.
    #[must_use]
    pub fn new(failures: usize) -> Self {
        Self {
            target: None,
            remaining_failures: Mutex::new(failures),
            log: CallLog::default(),
        }
    }

    /// Fails the first `failures` calls for records with the given element.
    #[must_use]
    pub fn failing_for(element: impl Into<String>, failures: usize) -> Self {
        Self {
            target: Some(element.into()),
            ..Self::new(failures)
        }
    }

    /// Returns the number of write calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log.call_count()
    }

    /// Returns the element of every record passed to `write`, failures included.
    #[must_use]
    pub fn attempted(&self) -> Vec<String> {
        self.log.attempted()
    }

    /// Returns the accepted records in write order.
    #[must_use]
    pub fn writes(&self) -> Vec<EventRecord> {
        self.log.writes()
    }
}

#[async_trait]
impl EventSink for FlakySink {
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        let call = self.log.attempt(record);

        let targeted = self
            .target
            .as_deref()
            .map_or(true, |target| target == record.element());
        if targeted {
            let mut remaining = self.remaining_failures.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SinkError::Unavailable(format!("flaky failure on call {call}")));
            }
        }

        self.log.accept(record);
        Ok(())
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// A sink that always fails.
#[derive(Debug, Default)]
pub struct FailingSink {
    log: CallLog,
}

impl FailingSink {
    /// Creates a sink that rejects every write with `Unavailable`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of write calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log.call_count()
    }
}

#[async_trait]
impl EventSink for FailingSink {
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.log.attempt(record);
        Err(SinkError::Unavailable("sink is down".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A sink that takes time to write.
#[derive(Debug)]
pub struct SlowSink {
    delay: Duration,
    log: CallLog,
}

impl SlowSink {
    /// Creates a sink that sleeps for `delay` before accepting.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            log: CallLog::default(),
        }
    }

    /// Creates a slow sink with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Returns the number of write calls, including unfinished ones.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log.call_count()
    }

    /// Returns the records whose write completed.
    #[must_use]
    pub fn writes(&self) -> Vec<EventRecord> {
        self.log.writes()
    }
}

#[async_trait]
impl EventSink for SlowSink {
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.log.attempt(record);
        tokio::time::sleep(self.delay).await;
        self.log.accept(record);
        Ok(())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// A sink that panics a fixed number of times before accepting.
#[derive(Debug)]
pub struct PanickingSink {
    remaining_panics: Mutex<usize>,
    log: CallLog,
}

impl PanickingSink {
    /// Panics on the first `panics` calls.
    #[must_use]
    pub fn new(panics: usize) -> Self {
        Self {
            remaining_panics: Mutex::new(panics),
            log: CallLog::default(),
        }
    }

    /// Returns the number of write calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log.call_count()
    }

    /// Returns the accepted records in write order.
    #[must_use]
    pub fn writes(&self) -> Vec<EventRecord> {
        self.log.writes()
    }
}

#[async_trait]
impl EventSink for PanickingSink {
    #[allow(clippy::panic)]
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.log.attempt(record);
        let should_panic = {
            let mut remaining = self.remaining_panics.lock();
            let hit = *remaining > 0;
            if hit {
                *remaining -= 1;
            }
            hit
        };
        if should_panic {
            panic!("sink exploded");
        }
        self.log.accept(record);
        Ok(())
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingSink::new();
        let record = EventRecord::click("A", 1.0, 2.0);

        assert_ok!(sink.write(&record).await);
        assert_eq!(sink.call_count(), 1);
        assert_eq!(sink.writes(), vec![record]);
    }

    #[tokio::test]
    async fn test_flaky_sink_targets_element() {
        let sink = FlakySink::failing_for("A", 1);
        let a = EventRecord::click("A", 0.0, 0.0);
        let b = EventRecord::click("B", 0.0, 0.0);

        assert_ok!(sink.write(&b).await);
        assert_err!(sink.write(&a).await);
        assert_ok!(sink.write(&a).await);

        assert_eq!(sink.attempted(), vec!["B", "A", "A"]);
        assert_eq!(sink.writes(), vec![b, a]);
    }

    #[tokio::test]
    async fn test_failing_sink() {
        let sink = FailingSink::new();
        let err = sink.write(&EventRecord::scroll(10.0)).await.unwrap_err();
        assert_eq!(err, SinkError::Unavailable("sink is down".to_string()));
        assert_eq!(sink.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sink_records_after_delay() {
        let sink = SlowSink::with_delay_ms(100);
        let start = tokio::time::Instant::now();
        assert_ok!(sink.write(&EventRecord::scroll(1.0)).await);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(sink.writes().len(), 1);
    }
}

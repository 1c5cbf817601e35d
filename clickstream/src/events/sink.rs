//! Sink trait and implementations.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn, Level};

use crate::core::EventRecord;
use crate::errors::SinkError;

/// Durable-storage write invoked by the queue worker once per attempt.
///
/// Implementations must be safe to call again for the same record after a
/// failure: the worker retries any error, whatever its cause. Atomicity of a
/// single write is the implementation's responsibility.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persists one record.
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "sink"
    }
}

#[async_trait]
impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        (**self).write(record).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A sink that accepts and discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn write(&self, _record: &EventRecord) -> Result<(), SinkError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// A sink decorator that logs every write and its outcome.
#[derive(Debug, Clone)]
pub struct LoggingEventSink<S> {
    inner: S,
    level: Level,
}

impl<S: EventSink> LoggingEventSink<S> {
    /// Wraps `inner`, logging successful writes at INFO.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self::with_level(inner, Level::INFO)
    }

    /// Wraps `inner`, logging successful writes at `level`.
    #[must_use]
    pub fn with_level(inner: S, level: Level) -> Self {
        Self { inner, level }
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn log_written(&self, record: &EventRecord) {
        if self.level == Level::DEBUG || self.level == Level::TRACE {
            debug!(
                sink = self.inner.name(),
                event_type = %record.event_type(),
                element = record.element(),
                "Event saved"
            );
        } else {
            info!(
                sink = self.inner.name(),
                event_type = %record.event_type(),
                element = record.element(),
                "Event saved"
            );
        }
    }
}

#[async_trait]
impl<S: EventSink> EventSink for LoggingEventSink<S> {
    async fn write(&self, record: &EventRecord) -> Result<(), SinkError> {
        match self.inner.write(record).await {
            Ok(()) => {
                self.log_written(record);
                Ok(())
            }
            Err(e) => {
                warn!(
                    sink = self.inner.name(),
                    event_type = %record.event_type(),
                    error = %e,
                    "Event write failed"
                );
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

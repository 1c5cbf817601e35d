//! Error types for the clickstream ingestion pipeline.
//!
//! The taxonomy follows the path an event takes: payload validation happens
//! before a record reaches the queue, queue rejections are returned directly
//! from `enqueue`, and Sink failures are resolved into the task handle once
//! the retry policy gives up.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// The main error type for clickstream operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// The submitted payload was rejected before it reached the queue.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The pending buffer is at capacity.
    #[error("Event queue is full ({capacity} pending tasks)")]
    QueueFull {
        /// Configured buffer capacity.
        capacity: usize,
    },

    /// The queue has been stopped and no longer accepts or processes tasks.
    #[error("Event queue is closed")]
    QueueClosed,

    /// Every allowed Sink attempt failed.
    #[error("Event {task_id} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The task that was finalized as failed.
        task_id: Uuid,
        /// Number of Sink invocations made.
        attempts: u32,
        /// The error returned by the last attempt.
        last_error: SinkError,
    },

    /// The worker went away without resolving the task.
    #[error("Task {0} was dropped before completion")]
    TaskDropped(Uuid),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Returns true if retrying the same `enqueue` call later may succeed.
    ///
    /// Only a full buffer can clear on its own; a closed queue stays closed
    /// and an invalid payload stays invalid.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }

    /// Stable machine-readable code for the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::QueueFull { .. } => "queue_full",
            Self::QueueClosed => "queue_closed",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::TaskDropped(_) => "task_dropped",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Converts the error into a JSON-friendly body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
            context: HashMap::new(),
        }
    }
}

/// Failure reported by a Sink write.
///
/// The worker treats every variant the same way: as a retryable failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The backing store could not be reached.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// The backing store refused the record.
    #[error("Sink rejected the record: {0}")]
    Rejected(String),

    /// The write did not finish within the configured per-call timeout.
    #[error("Sink call timed out after {0:?}")]
    Timeout(Duration),

    /// The write panicked; the worker caught it.
    #[error("Sink panicked: {0}")]
    Panicked(String),
}

/// Error raised when a submitted payload cannot become an event record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The `type` field is absent.
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// The `type` field holds a value outside the supported set.
    #[error("Unknown event type '{0}': expected one of click, scroll, mousemove")]
    UnknownEventType(String),

    /// The `timestamp` field could not be interpreted.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A field holds a value of the wrong shape.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Why the value was refused.
        reason: String,
    },

    /// The body is not a JSON object of the expected shape.
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// Error raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value as read.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// JSON error body returned at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable error code.
    pub code: String,
    /// Additional context key-value pairs.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
}

impl ErrorBody {
    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

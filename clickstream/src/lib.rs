//! # Clickstream
//!
//! Ordered ingestion of client interaction events.
//!
//! Producers hand validated [`EventRecord`](core::EventRecord)s to an
//! [`EventQueue`](queue::EventQueue), which returns immediately. A single
//! background worker forwards records to an [`EventSink`](events::EventSink)
//! one at a time, in arrival order, retrying failed writes with a fixed
//! delay until the attempt limit is reached.
//!
//! - **Non-blocking acceptance**: `enqueue` never waits on the Sink
//! - **Single consumer**: at most one Sink call in flight
//! - **Bounded retries**: each task ends as succeeded or failed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clickstream::prelude::*;
//!
//! let store = Arc::new(InMemoryEventStore::new());
//! let queue = EventQueue::with_defaults(store.clone());
//! queue.start();
//!
//! let handle = queue.enqueue(EventRecord::click("BUTTON#buy", 10.0, 20.0))?;
//! let receipt = handle.await?;
//!
//! queue.stop(true).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod queue;
pub mod testing;
pub mod utils;

#[cfg(feature = "server")]
pub mod http;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ServerConfig;
    pub use crate::core::{EventRecord, EventSubmission, EventType, TaskReceipt, TaskStatus};
    pub use crate::errors::{IngestError, SinkError, ValidationError};
    pub use crate::events::{
        EventQueries, EventSink, InMemoryEventStore, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::queue::{EventQueue, QueueConfig, RetryPolicy, TaskHandle, TaskOutcome};
    pub use crate::utils::Timestamp;
    pub use std::sync::Arc;
}

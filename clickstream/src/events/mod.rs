//! Durable-storage side of the pipeline.
//!
//! [`EventSink`] is the write the queue worker performs for each task;
//! [`InMemoryEventStore`] is the bundled implementation, which also serves
//! the recent-events read path.

mod sink;
mod store;

pub use sink::{EventSink, LoggingEventSink, NoOpEventSink};
pub use store::{EventQueries, InMemoryEventStore, StoredEvent};

#[cfg(test)]
pub use sink::MockEventSink;

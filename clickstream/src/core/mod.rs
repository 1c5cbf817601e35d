//! Core types: event records, tasks, and task status.

mod event;
mod status;
mod task;

pub use event::{EventRecord, EventRecordBuilder, EventSubmission, EventType, UNKNOWN_ELEMENT};
pub use status::TaskStatus;
pub use task::{Task, TaskReceipt};

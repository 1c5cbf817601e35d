//! Queue-side wrapper around an event record.

use serde::Serialize;
use uuid::Uuid;

use super::{EventRecord, EventType, TaskStatus};
use crate::errors::SinkError;

/// Retry bookkeeping for one event record.
///
/// The task owns its record exclusively and never changes it; only the
/// attempt counter, status and last error move. Retry timing is owned by
/// the queue.
#[derive(Debug, Clone)]
pub struct Task {
    id: Uuid,
    sequence: u64,
    record: EventRecord,
    attempts: u32,
    status: TaskStatus,
    last_error: Option<SinkError>,
}

impl Task {
    /// Wraps a record that arrived as the `sequence`-th enqueue.
    #[must_use]
    pub fn new(sequence: u64, record: EventRecord) -> Self {
        Self {
            id: Uuid::now_v7(),
            sequence,
            record,
            attempts: 0,
            status: TaskStatus::Pending,
            last_error: None,
        }
    }

    /// Unique task id (time-ordered).
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Original arrival position.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The wrapped record.
    #[must_use]
    pub fn record(&self) -> &EventRecord {
        &self.record
    }

    /// Sink invocations made so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Error returned by the most recent failed attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<&SinkError> {
        self.last_error.as_ref()
    }

    /// Marks the task in-flight and counts the attempt. Returns the attempt number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.status = TaskStatus::InFlight;
        self.attempts += 1;
        self.attempts
    }

    /// Puts a failed task back to pending until its next attempt.
    pub fn reschedule(&mut self, error: SinkError) {
        self.status = TaskStatus::Pending;
        self.last_error = Some(error);
    }

    /// Records a successful write.
    pub fn mark_succeeded(&mut self) {
        self.status = TaskStatus::Succeeded;
    }

    /// Records the final failure.
    pub fn mark_failed_final(&mut self, error: SinkError) {
        self.status = TaskStatus::FailedFinal;
        self.last_error = Some(error);
    }

    /// Summary handed to the producer on success.
    #[must_use]
    pub fn receipt(&self) -> TaskReceipt {
        TaskReceipt {
            task_id: self.id,
            event_type: self.record.event_type(),
            attempts: self.attempts,
        }
    }
}

/// Outcome of a task that reached the Sink successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskReceipt {
    /// The completed task.
    pub task_id: Uuid,
    /// The kind of event that was written.
    pub event_type: EventType,
    /// Sink invocations it took, including the successful one.
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending_with_no_attempts() {
        let task = Task::new(7, EventRecord::scroll(450.0));
        assert_eq!(task.sequence(), 7);
        assert_eq!(task.attempts(), 0);
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.last_error().is_none());
    }

    #[test]
    fn test_first_attempt_counts_as_one() {
        let mut task = Task::new(0, EventRecord::scroll(450.0));
        assert_eq!(task.begin_attempt(), 1);
        assert_eq!(task.status(), TaskStatus::InFlight);
    }

    #[test]
    fn test_rescheduled_task_is_pending_with_last_error() {
        let mut task = Task::new(0, EventRecord::mouse_move(1.0, 2.0));
        task.begin_attempt();

        let error = SinkError::Unavailable("down".to_string());
        task.reschedule(error.clone());

        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.last_error(), Some(&error));
        assert_eq!(task.begin_attempt(), 2);
    }

    #[test]
    fn test_record_untouched_by_bookkeeping() {
        let record = EventRecord::click("BUTTON#test-btn-1", 10.0, 20.0);
        let mut task = Task::new(0, record.clone());
        task.begin_attempt();
        task.mark_failed_final(SinkError::Rejected("dup".to_string()));

        assert_eq!(task.record(), &record);
        assert!(task.status().is_terminal());
    }

    #[test]
    fn test_receipt() {
        let mut task = Task::new(0, EventRecord::click("A", 0.0, 0.0));
        task.begin_attempt();
        task.begin_attempt();
        task.mark_succeeded();

        let receipt = task.receipt();
        assert_eq!(receipt.task_id, task.id());
        assert_eq!(receipt.attempts, 2);
        assert_eq!(receipt.event_type, EventType::Click);
    }
}

//! Completion handle returned by `enqueue`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::core::TaskReceipt;
use crate::errors::IngestError;

/// Final outcome of a queued task.
pub type TaskOutcome = Result<TaskReceipt, IngestError>;

/// Resolves once the task reaches a terminal state.
///
/// Dropping the handle does not cancel the task; the worker still processes
/// it and simply discards the outcome.
#[derive(Debug)]
#[must_use = "the handle reports whether the event was persisted"]
pub struct TaskHandle {
    task_id: Uuid,
    rx: oneshot::Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub(crate) fn new(task_id: Uuid, rx: oneshot::Receiver<TaskOutcome>) -> Self {
        Self { task_id, rx }
    }

    /// The id of the task this handle tracks.
    #[must_use]
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }
}

impl Future for TaskHandle {
    type Output = TaskOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(IngestError::TaskDropped(this.task_id))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventType;

    #[tokio::test]
    async fn test_handle_resolves_with_sent_outcome() {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::now_v7();
        let handle = TaskHandle::new(id, rx);

        let receipt = TaskReceipt {
            task_id: id,
            event_type: EventType::Scroll,
            attempts: 1,
        };
        tx.send(Ok(receipt)).unwrap();

        assert_eq!(handle.await, Ok(receipt));
    }

    #[tokio::test]
    async fn test_handle_reports_dropped_sender() {
        let (tx, rx) = oneshot::channel::<TaskOutcome>();
        let id = Uuid::now_v7();
        let handle = TaskHandle::new(id, rx);
        drop(tx);

        assert_eq!(handle.await, Err(IngestError::TaskDropped(id)));
    }
}

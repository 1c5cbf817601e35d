//! Test assertions for task outcomes.

use crate::errors::IngestError;
use crate::queue::TaskOutcome;

/// Asserts that the task was persisted, returning its attempt count.
pub fn assert_succeeded(outcome: &TaskOutcome) -> u32 {
    match outcome {
        Ok(receipt) => receipt.attempts,
        Err(e) => panic!("Expected success, got error: {e}"),
    }
}

/// Asserts that the task was finalized as failed after `attempts` Sink calls.
pub fn assert_exhausted(outcome: &TaskOutcome, attempts: u32) {
    match outcome {
        Err(IngestError::RetriesExhausted {
            attempts: actual, ..
        }) => assert_eq!(
            *actual, attempts,
            "Expected {attempts} attempts, got {actual}"
        ),
        other => panic!("Expected exhausted retries, got {other:?}"),
    }
}

/// Asserts that the task was abandoned by a non-draining stop.
pub fn assert_closed(outcome: &TaskOutcome) {
    assert!(
        matches!(outcome, Err(IngestError::QueueClosed)),
        "Expected QueueClosed, got {outcome:?}"
    );
}

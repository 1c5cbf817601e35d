//! Task lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a queued task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue, possibly for a retry delay to elapse.
    #[default]
    Pending,
    /// Handed to the Sink; at most one task is in this state at a time.
    InFlight,
    /// The Sink accepted the record.
    Succeeded,
    /// The retry policy gave up on the task.
    FailedFinal,
}

impl TaskStatus {
    /// Returns true if no further transitions can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedFinal)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::FailedFinal => write!(f, "failed_final"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InFlight.is_terminal());
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::FailedFinal.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::FailedFinal).unwrap(),
            "\"failed_final\""
        );
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }
}

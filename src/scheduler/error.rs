//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Cadence expression could not be parsed
    InvalidCadence {
        expression: String,
        reason: String,
    },

    /// `start` called on a scheduler that is already armed
    AlreadyStarted,

    /// `stop` called on a scheduler that was never armed
    NotStarted,

    /// Tick loop task terminated abnormally
    LoopFailed {
        reason: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCadence { expression, reason } => {
                write!(f, "Invalid cadence '{}': {}", expression, reason)
            }
            Self::AlreadyStarted => write!(f, "Scheduler is already started"),
            Self::NotStarted => write!(f, "Scheduler is not started"),
            Self::LoopFailed { reason } => {
                write!(f, "Scheduler loop failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid cadence error
    pub fn invalid_cadence(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCadence {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LoopFailed { .. })
    }
}

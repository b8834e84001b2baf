//! Error types for the workplan model

use chrono::NaiveDate;

/// Field-level validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Text is not a number
    #[error("not a number: '{0}'")]
    InvalidNumber(String),

    /// Budget below zero or not finite
    #[error("budget must be a non-negative amount, got {0}")]
    NegativeBudget(f64),

    /// Progress outside 0..=100
    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i64),

    /// Task status outside 0..=10
    #[error("task status must be between 0 and 10, got {0}")]
    TaskStatusOutOfRange(i64),

    /// Date text not in `YYYY-MM-DD` form
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Activity ends before it starts
    #[error("timeline ends ({end}) before it starts ({start})")]
    InvertedTimeline { start: NaiveDate, end: NaiveDate },

    /// Unrecognized status label
    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    /// Unrecognized visibility label
    #[error("unknown visibility '{0}'")]
    UnknownVisibility(String),

    /// Task target below zero or not finite
    #[error("target must be a non-negative number, got {0}")]
    NegativeTarget(f64),

    /// Year outside the four-digit range
    #[error("invalid year '{0}'")]
    InvalidYear(String),
}

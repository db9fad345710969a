//! Error types for the task allocation engine.
//!
//! Validators return typed failures rather than clamping silently; the caller
//! owns user-facing messaging and retry. Every operation is safe to retry
//! after the input is fixed, with one exception: a `PartialDeleteFailure`
//! leaves the tree inconsistent and needs operator attention.

use thiserror::Error;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("Requested percentage {requested} exceeds available budget {available}")]
    PercentageExceeded { requested: u32, available: u32 },

    #[error("Requested hours {requested} exceed available parent budget {available}")]
    HoursExceeded { requested: f64, available: f64 },

    #[error("Deadline {deadline} is after the permitted ceiling {ceiling}")]
    DeadlineOutOfRange {
        deadline: chrono::DateTime<chrono::Utc>,
        ceiling: chrono::DateTime<chrono::Utc>,
    },

    #[error("Timer already active for user {user_id} on task {task_id}")]
    TimerAlreadyActive { task_id: String, user_id: String },

    #[error("No active timer for user {user_id} on task {task_id}")]
    NoActiveTimer { task_id: String, user_id: String },

    #[error("Invalid duration: {0} minutes (must be positive)")]
    InvalidDuration(f64),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cascade delete of {root_id} stopped at {failed_id} after removing {deleted} task(s): {source}")]
    PartialDeleteFailure {
        root_id: String,
        failed_id: String,
        deleted: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result alias using the engine error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_budget() {
        let err = Error::PercentageExceeded {
            requested: 50,
            available: 40,
        };
        let msg = err.to_string();
        assert!(msg.contains("50"));
        assert!(msg.contains("40"));
    }

    #[test]
    fn partial_delete_carries_progress() {
        let err = Error::PartialDeleteFailure {
            root_id: "a".into(),
            failed_id: "b".into(),
            deleted: 2,
            source: Box::new(Error::Store("backend offline".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("removing 2"));
        assert!(msg.contains("backend offline"));
    }
}

//! Error types used by the queue engine and tasks.
//!
//! This module defines two main error enums:
//!
//! - [`QueueError`] — errors raised by queue operations themselves.
//! - [`TaskError`] — errors raised by individual task attempts.
//!
//! Both types provide `as_label` for logging/metrics, and [`TaskError`]
//! additionally exposes [`TaskError::is_retryable`], which drives the
//! queue's retry scheduling.
//!
//! Lifecycle misuse (pausing a paused queue, deleting a deleted queue) is
//! deliberately NOT an error: those operations are no-ops so the controller
//! stays idempotent under races from an outer API layer.

use thiserror::Error;

/// # Errors produced by queue operations.
///
/// These represent submissions the queue cannot accept. Background loops
/// never produce errors; shutdown is signalled through cancellation tokens.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue has been deleted; no further tasks are accepted.
    #[error("queue has been deleted")]
    Deleted,

    /// A live (non-completed, non-deleted) task with this name already exists.
    #[error("task {name:?} already exists")]
    DuplicateTask {
        /// The colliding task name.
        name: String,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use paceq::QueueError;
    ///
    /// assert_eq!(QueueError::Deleted.as_label(), "queue_deleted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Deleted => "queue_deleted",
            QueueError::DuplicateTask { .. } => "duplicate_task",
        }
    }
}

/// # Errors produced by task attempts.
///
/// Returned by [`Task::attempt`](crate::Task::attempt) implementations.
/// `Fail` is retryable; `Fatal` and `Canceled` terminate the task.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Attempt failed but may succeed if retried.
    #[error("attempt failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error; the task completes as failed without retry.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Attempt observed cancellation and stopped cooperatively.
    #[error("attempt cancelled")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for a retryable failure.
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Convenience constructor for a fatal failure.
    pub fn fatal(error: impl Into<String>) -> Self {
        TaskError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether the queue should schedule another attempt.
    ///
    /// Returns `true` only for [`TaskError::Fail`]; fatal and cancelled
    /// attempts terminate the task.
    ///
    /// # Example
    /// ```
    /// use paceq::TaskError;
    ///
    /// assert!(TaskError::fail("boom").is_retryable());
    /// assert!(!TaskError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. })
    }
}

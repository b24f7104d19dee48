//! Task abstractions and handles.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for implementing one execution attempt
//! - [`TaskFn`] - closure-backed task implementation
//! - [`TaskState`], [`TaskStatus`] - caller-visible declared state
//! - [`TaskHandle`], [`TaskRef`] - engine-owned handle driving schedule,
//!   dispatch, retry, and deletion

mod handle;
mod state;
mod task;

pub use handle::{TaskHandle, TaskRef};
pub use state::{TaskState, TaskStatus};
pub use task::{Task, TaskFn};

pub(crate) use handle::DoneCallback;

//! # Task abstraction and closure-backed implementation.
//!
//! This module defines the [`Task`] trait (one async, cancelable execution
//! attempt) and a convenient closure-backed implementation [`TaskFn`].
//!
//! An attempt receives a [`CancellationToken`] and should periodically check
//! it to stop cooperatively when the task is deleted mid-attempt.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # One execution attempt of a queued task.
///
/// The queue invokes [`attempt`](Task::attempt) from a worker slot each time
/// the task passes the dispatcher; the slot is occupied for the duration of
/// the attempt. Returning [`TaskError::Fail`] re-enters the retry path;
/// `Ok` and any other error are terminal.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use paceq::{Task, TaskError};
///
/// struct Ping;
///
/// #[async_trait]
/// impl Task for Ping {
///     async fn attempt(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Performs one execution attempt.
    ///
    /// Implementations should check `ctx.is_cancelled()` at convenient points
    /// and return [`TaskError::Canceled`] promptly when the task is deleted.
    async fn attempt(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}

/// Closure-backed task implementation.
///
/// Wraps a closure that *creates* a new future per attempt, so there is no
/// shared mutable state between attempts; if shared state is needed, move an
/// `Arc<...>` into the closure explicitly.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use paceq::{TaskFn, TaskError};
///
/// let ping = TaskFn::arc(|_ctx: CancellationToken| async move {
///     // do work...
///     Ok::<_, TaskError>(())
/// });
/// ```
#[derive(Debug)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new closure-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need an `Arc<dyn Task>`.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn attempt(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}

//! # paceq
//!
//! **paceq** is a rate-paced task queue engine for Rust.
//!
//! It emulates the dispatch core of a cloud task-queue service: a named
//! queue accepts tasks and hands them to worker execution slots at a
//! strictly bounded rate, with configurable burst capacity, concurrency
//! limits, retry policy, and runtime pause/resume/delete controls. The
//! crate is designed as a building block for emulators and services that
//! need precise dispatch pacing without an external broker.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TaskState + │   │  TaskState + │   │  TaskState + │
//!     │  Task impl   │   │  Task impl   │   │  Task impl   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ submit_task      ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Queue (lifecycle controller)                                     │
//! │  - TaskRegistry (name → handle, tombstones, purge)                │
//! │  - TokenBucket (bounded permits, starts full)                     │
//! │  - Bus (broadcast events)                                         │
//! │  - cancellation tokens (generator / per-run-cycle)                │
//! └──────┬──────────────────────┬────────────────────────┬────────────┘
//!        ▼                      ▼                        ▼
//! ┌──────────────┐      ┌──────────────┐        ┌──────────────────┐
//! │TokenGenerator│─mint─►│ TokenBucket │◄─take──│    Dispatcher    │
//! └──────────────┘      └──────────────┘        └───┬──────────▲───┘
//!                                              work │          │ fire
//!                                                   ▼          │
//!                                          ┌──────────────┐    │
//!                                          │  WorkerPool  │    │
//!                                          │ slot₁..slotC │    │
//!                                          └──────┬───────┘    │
//!                                                 ▼            │
//!                                       TaskHandle::attempt()  │
//!                                          │ retryable failure │
//!                                          └── schedule(delay)─┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Queue::new ──► Running (declared) ──► Queue::run() starts:
//!                  - token generator   (stops on delete)
//!                  - dispatcher        (stops on pause/delete)
//!                  - C worker slots    (stop on pause/delete)
//!
//! pause()  ──► cycle token cancelled; in-flight attempts finish;
//!              tokens keep accumulating up to the burst cap
//! resume() ──► fresh cycle token; dispatcher + workers restarted
//! delete() ──► terminal; every loop cancelled, every task purged
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                    |
//! |-------------------|----------------------------------------------------------------------|---------------------------------------|
//! | **Pacing**        | Token-bucket rate limiting with burst capacity.                      | [`RateLimits`]                        |
//! | **Concurrency**   | Fixed worker-slot ceiling; one slot per in-flight attempt.           | [`RateLimits::max_concurrent_dispatches`] |
//! | **Retry**         | Doubling backoff with attempt budget, queue-driven rescheduling.     | [`RetryPolicy`], [`TaskError`]        |
//! | **Lifecycle**     | Pause/resume/delete/purge, idempotent under races.                   | [`Queue`], [`QueueState`]             |
//! | **Tasks**         | Define attempts as trait impls or closures.                          | [`Task`], [`TaskFn`], [`TaskHandle`]  |
//! | **Configuration** | Explicit resolution: caller values → overrides → defaults.           | [`QueueOptions`], [`ConfigOverrides`] |
//! | **Observability** | Broadcast bus of task/queue events.                                  | [`Bus`], [`Event`], [`EventKind`]     |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use paceq::{ConfigOverrides, Queue, QueueOptions, TaskError, TaskFn, TaskState};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let options = QueueOptions {
//!         max_dispatches_per_second: Some(50.0),
//!         max_burst_size: Some(10),
//!         max_concurrent_dispatches: Some(4),
//!         ..QueueOptions::default()
//!     };
//!
//!     let (queue, config) = Queue::new(
//!         "invoices",
//!         options,
//!         &ConfigOverrides::default(),
//!         |state: &TaskState| println!("task {} finished as {:?}", state.name, state.status),
//!     );
//!     assert_eq!(config.rate.max_burst_size, 10);
//!     queue.run();
//!
//!     let work = TaskFn::arc(|_ctx: CancellationToken| async move {
//!         // deliver the payload...
//!         Ok::<_, TaskError>(())
//!     });
//!     let (_handle, state) = queue
//!         .submit_task(TaskState::new("invoice-1"), work)
//!         .expect("queue accepts tasks while running");
//!     assert_eq!(state.dispatch_count, 0);
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     queue.delete();
//! }
//! ```

mod config;
mod error;
mod events;
mod policies;
mod queue;
mod tasks;

// ---- Public re-exports ----

pub use config::{ConfigOverrides, QueueConfig, QueueOptions, RateLimits};
pub use error::{QueueError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use policies::RetryPolicy;
pub use queue::{Queue, QueueState};
pub use tasks::{Task, TaskFn, TaskHandle, TaskRef, TaskState, TaskStatus};

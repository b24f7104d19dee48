//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the queue controller, the
//! dispatcher, and task handles.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Queue` (lifecycle transitions), `TaskHandle`
//!   (dispatch/completion/retry).
//! - **Consumers**: anything holding a receiver from [`Bus::subscribe`] —
//!   log writers, metrics, test instrumentation.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

//! # Task registry: name → handle mapping with tombstones.
//!
//! The registry is touched from independent concurrent contexts: the
//! admission path inserts, each task's completion callback removes, and
//! purge sweeps everything. A single mutex makes every operation mutually
//! exclusive.
//!
//! ## Rules
//! - Removal tombstones the entry (`None`) rather than dropping the key, so
//!   a name is observably "was here, now deleted".
//! - Purge holds the lock for the whole sweep: no task can fire concurrently
//!   with its own deletion.
//! - Purge is fire-and-forget relative to its caller; observers poll
//!   [`TaskRegistry::live_count`] rather than assuming synchronous
//!   completion.
//! - The lock is synchronous (operations are short and never await), which
//!   lets completion callbacks remove entries without entering the runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::tasks::TaskRef;

/// Mutually-exclusive map from task name to task handle.
#[derive(Default)]
pub(crate) struct TaskRegistry {
    tasks: Mutex<HashMap<String, Option<TaskRef>>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a task handle under its name.
    ///
    /// Returns `false` if a live (non-tombstoned) task already holds the
    /// name; the existing task is left untouched.
    pub(crate) fn insert(&self, task: TaskRef) -> bool {
        let mut tasks = self.lock();
        match tasks.get(task.name()) {
            Some(Some(_)) => false,
            _ => {
                tasks.insert(task.name().to_string(), Some(task));
                true
            }
        }
    }

    /// Looks up a live task by name.
    pub(crate) fn get(&self, name: &str) -> Option<TaskRef> {
        self.lock().get(name).and_then(|slot| slot.clone())
    }

    /// Tombstones the entry for `name`.
    pub(crate) fn remove(&self, name: &str) {
        if let Some(slot) = self.lock().get_mut(name) {
            *slot = None;
        }
    }

    /// Number of live (non-tombstoned) entries.
    pub(crate) fn live_count(&self) -> usize {
        self.lock().values().filter(|slot| slot.is_some()).count()
    }

    /// Deletes every live task, asynchronously relative to the caller.
    ///
    /// The spawned sweep holds the lock while calling each task's `delete`,
    /// then tombstones the entry.
    pub(crate) fn purge(self: &Arc<Self>) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut tasks = registry.lock();
            for slot in tasks.values_mut() {
                if let Some(task) = slot.take() {
                    // Avoid the task firing mid-sweep.
                    task.delete();
                }
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Option<TaskRef>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::events::Bus;
    use crate::policies::RetryPolicy;
    use crate::tasks::{TaskFn, TaskHandle, TaskState, TaskStatus};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn handle(name: &str) -> TaskRef {
        let (fire_tx, _fire_rx) = mpsc::channel(1);
        TaskHandle::new(
            TaskState::new(name),
            TaskFn::arc(|_ctx: CancellationToken| async { Ok::<_, TaskError>(()) }),
            fire_tx,
            RetryPolicy::default(),
            Bus::new(4),
            Arc::new(|_st: &TaskState| {}),
        )
    }

    #[tokio::test]
    async fn test_insert_get_remove_round_trip() {
        let registry = TaskRegistry::new();

        assert!(registry.insert(handle("a")));
        assert!(registry.get("a").is_some());
        assert_eq!(registry.live_count(), 1);

        registry.remove("a");
        assert!(registry.get("a").is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_live_name_collision_rejected() {
        let registry = TaskRegistry::new();

        assert!(registry.insert(handle("a")));
        assert!(!registry.insert(handle("a")));

        // A tombstoned name is free again.
        registry.remove("a");
        assert!(registry.insert(handle("a")));
    }

    #[tokio::test]
    async fn test_purge_deletes_every_live_task() {
        let registry = TaskRegistry::new();
        let first = handle("a");
        let second = handle("b");
        registry.insert(first.clone());
        registry.insert(second.clone());

        registry.purge();

        // Purge is fire-and-forget; poll for the sweep to land.
        for _ in 0..100 {
            if registry.live_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.live_count(), 0);
        assert_eq!(first.state().status, TaskStatus::Deleted);
        assert_eq!(second.state().status, TaskStatus::Deleted);
    }
}

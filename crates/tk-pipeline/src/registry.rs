//! In-memory task status registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tk_core::{ProgressSnapshot, ProgressState, StatusRegistry, TaskId};

/// Live progress of every running remux, keyed by task.
///
/// The lock is held for a single insert, remove, or lookup and never across
/// an await point.
#[derive(Debug, Default)]
pub struct TaskStatusRegistry {
    tasks: Mutex<HashMap<TaskId, Arc<ProgressState>>>,
}

impl TaskStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, task_id: TaskId) -> Option<Arc<ProgressState>> {
        self.tasks.lock().get(&task_id).cloned()
    }

    /// Snapshot of every registered task.
    ///
    /// States are cloned out under the lock and measured after it is released.
    pub fn snapshot_all(&self) -> Vec<(TaskId, ProgressSnapshot)> {
        let states: Vec<(TaskId, Arc<ProgressState>)> = self
            .tasks
            .lock()
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect();
        states
            .into_iter()
            .map(|(id, state)| (id, state.snapshot()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl StatusRegistry for TaskStatusRegistry {
    fn register(&self, task_id: TaskId, progress: Arc<ProgressState>) {
        if self.tasks.lock().insert(task_id, progress).is_some() {
            tracing::warn!(task_id = %task_id, "replaced existing progress entry");
        }
    }

    fn unregister(&self, task_id: TaskId) {
        self.tasks.lock().remove(&task_id);
    }
}

//! Seams through which task state leaves the core.
//!
//! The task owner supplies implementations: a [`StatusRegistry`] that
//! presents live progress and a [`FailureNotifier`] that delivers the one
//! user-visible failure message of a task.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ids::TaskId;
use crate::progress::ProgressState;

/// Shared mapping from task id to live progress.
///
/// Implementations must hold any internal lock only for the duration of a
/// single insert or remove.
pub trait StatusRegistry: Send + Sync {
    fn register(&self, task_id: TaskId, progress: Arc<ProgressState>);
    fn unregister(&self, task_id: TaskId);
}

/// User-visible failure delivery.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn report_failure(&self, task_id: TaskId, message: &str);
}

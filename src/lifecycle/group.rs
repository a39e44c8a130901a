//! Process group: the set of supervised tasks of one run.
//!
//! Two kinds of task live in a group:
//! - **awaited** tasks ([`ProcessGroup::spawn`]) are joined by
//!   [`ProcessGroup::wait`]; the first one to fail decides the result and
//!   cancels the run.
//! - **detached** tasks ([`ProcessGroup::spawn_detached`]) are tracked but
//!   never waited for. Whatever is still running when `wait` returns is
//!   aborted and logged as abandoned.

use std::future::Future;

use tokio::task::{AbortHandle, JoinError, JoinSet};

use crate::lifecycle::context::{CancelCause, CancelHandle};
use crate::lifecycle::supervisor::SupervisorError;

pub struct ProcessGroup {
    cancel: CancelHandle,
    tasks: JoinSet<Result<(), SupervisorError>>,
    detached: JoinSet<()>,
    detached_names: Vec<(String, AbortHandle)>,
}

impl ProcessGroup {
    /// Create an empty group bound to the run's cancel handle.
    pub fn new(cancel: CancelHandle) -> Self {
        Self {
            cancel,
            tasks: JoinSet::new(),
            detached: JoinSet::new(),
            detached_names: Vec::new(),
        }
    }

    /// Spawn an awaited task.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), SupervisorError>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Spawn a tracked task whose outcome the group does not wait for.
    pub fn spawn_detached<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.detached.spawn(task);
        self.detached_names.push((name.into(), handle));
    }

    /// Number of awaited tasks still running.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every awaited task and return the first error.
    ///
    /// The first error also cancels the run so the remaining tasks can wind
    /// down; errors after the first are only logged.
    pub async fn wait(&mut self) -> Result<(), SupervisorError> {
        let mut first: Option<SupervisorError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let err = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(join_err) => match panic_error(join_err) {
                    Some(err) => err,
                    None => continue,
                },
            };

            if first.is_none() {
                self.cancel.cancel(CancelCause::TaskFailed {
                    error: err.to_string(),
                });
                first = Some(err);
            } else {
                tracing::warn!(error = %err, "additional supervised task error");
            }
        }

        self.abandon_detached();
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Abort detached tasks that are still running.
    fn abandon_detached(&mut self) {
        for (name, handle) in self.detached_names.drain(..) {
            if !handle.is_finished() {
                tracing::warn!(service = %name, "abandoning unfinished start task");
            }
        }
        self.detached.abort_all();
    }
}

impl std::fmt::Debug for ProcessGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessGroup")
            .field("tasks", &self.tasks.len())
            .field("detached", &self.detached_names.len())
            .finish()
    }
}

fn panic_error(err: JoinError) -> Option<SupervisorError> {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Some(SupervisorError::TaskPanicked(message))
    } else {
        None
    }
}

//! Supervised background tasks with explicit cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::lifecycle::{Shutdown, ShutdownSignal};

/// How a supervised task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExit<T> {
    /// Finished on its own or after the shutdown signal.
    Completed(T),
    /// Did not finish within the grace period and was aborted.
    Aborted,
    /// Panicked.
    Panicked,
}

/// A spawned task paired with its own shutdown coordinator.
pub struct SupervisedTask<T> {
    name: &'static str,
    shutdown: Shutdown,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> SupervisedTask<T> {
    /// Spawn `make(signal)` as a background task.
    pub fn spawn<F, Fut>(name: &'static str, make: F) -> Self
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(make(shutdown.subscribe()));
        tracing::info!(task = name, "Spawned background task");
        Self {
            name,
            shutdown,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal shutdown and wait up to `grace` for the task to finish.
    pub async fn stop(self, grace: Duration) -> TaskExit<T> {
        self.shutdown.trigger();

        let mut handle = self.handle;
        match timeout(grace, &mut handle).await {
            Ok(Ok(value)) => {
                tracing::info!(task = self.name, "Task stopped");
                TaskExit::Completed(value)
            }
            Ok(Err(e)) => {
                tracing::error!(task = self.name, error = %e, "Task panicked");
                TaskExit::Panicked
            }
            Err(_) => {
                handle.abort();
                tracing::warn!(
                    task = self.name,
                    grace_secs = grace.as_secs(),
                    "Task did not stop within grace period, aborted"
                );
                TaskExit::Aborted
            }
        }
    }
}

//! Queue backed by a tokio runtime's blocking thread pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;

use super::{DispatchQueue, QueueClosed, Task};

/// Hands each task to `spawn_blocking` on a tokio runtime, after an optional
/// `tokio::time::sleep`.
///
/// Tasks may run concurrently with each other; the request manager still
/// never overlaps two attempts of the same request because a retry is only
/// dispatched once the previous attempt has returned.
pub struct RuntimeQueue {
    name: String,
    handle: Handle,
    closed: AtomicBool,
}

impl RuntimeQueue {
    /// Queue on an explicit runtime handle. The runtime must have the time
    /// driver enabled.
    pub fn new(name: impl Into<String>, handle: Handle) -> Self {
        Self {
            name: name.into(),
            handle,
            closed: AtomicBool::new(false),
        }
    }

    /// Queue on the runtime of the calling context.
    pub fn current(name: impl Into<String>) -> Result<Self, tokio::runtime::TryCurrentError> {
        Ok(Self::new(name, Handle::try_current()?))
    }

    /// Reject further tasks. Tasks already handed to the runtime still run.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl DispatchQueue for RuntimeQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch_after(&self, delay: Duration, task: Task) -> Result<(), QueueClosed> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueClosed(self.name.clone()));
        }
        let name = self.name.clone();
        self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(e) = tokio::task::spawn_blocking(task).await {
                tracing::error!(queue = %name, "dispatched task failed: {}", e);
            }
        });
        Ok(())
    }
}

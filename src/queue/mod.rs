//! Dispatch queues: "run this later, possibly on another thread".
//!
//! The request manager drives every attempt and every retry through a
//! [`DispatchQueue`]; listener callbacks may be redirected to a second one.
//! [`SerialQueue`] runs tasks one at a time on a dedicated thread,
//! [`RuntimeQueue`] hands them to a tokio runtime's blocking pool.

mod runtime;
mod serial;

use std::time::Duration;

pub use runtime::RuntimeQueue;
pub use serial::SerialQueue;

/// A unit of work accepted by a dispatch queue.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Returned when a task is dispatched to a queue that was shut down.
#[derive(Debug, thiserror::Error)]
#[error("dispatch queue '{0}' is shut down")]
pub struct QueueClosed(pub String);

/// Ordered, possibly-delayed task execution facility.
pub trait DispatchQueue: Send + Sync {
    /// Human-readable queue name (used in logs).
    fn name(&self) -> &str;

    /// Run `task` once `delay` has elapsed. A task that is rejected, or
    /// discarded at shutdown, is dropped without running.
    fn dispatch_after(&self, delay: Duration, task: Task) -> Result<(), QueueClosed>;

    /// Run `task` as soon as the queue gets to it.
    fn dispatch_async(&self, task: Task) -> Result<(), QueueClosed> {
        self.dispatch_after(Duration::ZERO, task)
    }
}

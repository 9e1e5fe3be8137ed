//! Dedicated-thread serial queue with delayed tasks.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use super::{DispatchQueue, QueueClosed, Task};

/// Longer delays are clamped; `Instant` arithmetic panics on overflow.
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct Scheduled {
    due: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Same due time runs in submission order.
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

#[derive(Default)]
struct State {
    pending: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs tasks one at a time, in due-time order, on its own thread.
///
/// Dropping the queue (or calling [`SerialQueue::shutdown`]) discards tasks
/// that have not started yet and joins the worker.
pub struct SerialQueue {
    name: String,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl SerialQueue {
    /// Spawn the worker thread for a new queue.
    pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(&worker_shared))?;
        let worker_id = handle.thread().id();
        Ok(Self {
            name,
            shared,
            worker: Mutex::new(Some(handle)),
            worker_id,
        })
    }

    /// True when called from this queue's worker thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// Number of tasks waiting to run (including delayed ones).
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Stop accepting tasks, drop pending ones and wait for the running task.
    pub fn shutdown(&self) {
        let dropped = {
            let mut state = self.shared.lock();
            state.closed = true;
            std::mem::take(&mut state.pending)
        };
        self.shared.wake.notify_all();
        if !dropped.is_empty() {
            tracing::debug!(queue = %self.name, count = dropped.len(), "discarding pending tasks");
        }
        // Dropped outside the lock: tasks may own handles that re-enter the queue.
        drop(dropped);

        if self.is_current() {
            return;
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(queue = %self.name, "dispatch worker panicked");
            }
        }
    }
}

impl DispatchQueue for SerialQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch_after(&self, delay: Duration, task: Task) -> Result<(), QueueClosed> {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(QueueClosed(self.name.clone()));
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pending.push(Reverse(Scheduled {
                due: Instant::now() + delay.min(MAX_DELAY),
                seq,
                task,
            }));
        }
        self.shared.wake.notify_one();
        Ok(())
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared) {
    let mut state = shared.lock();
    loop {
        if state.closed {
            return;
        }
        let now = Instant::now();
        let wait = match state.pending.peek().map(|Reverse(top)| top.due) {
            None => None,
            Some(due) if due <= now => {
                let Some(Reverse(next)) = state.pending.pop() else {
                    continue;
                };
                drop(state);
                if catch_unwind(AssertUnwindSafe(next.task)).is_err() {
                    tracing::error!("dispatched task panicked");
                }
                state = shared.lock();
                continue;
            }
            Some(due) => Some(due - now),
        };
        state = match wait {
            None => shared.wake.wait(state).unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                shared
                    .wake
                    .wait_timeout(state, timeout)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
    }
}

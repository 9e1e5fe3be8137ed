//! Request manager: drives submitted requests through attempt, retry and
//! finalization on a network dispatch queue.
//!
//! Every attempt of a request, and every retry, runs as a task on the same
//! network queue. A retry is only scheduled after the previous attempt has
//! returned and the request's retry policy has been consulted, so one
//! request never has two attempts in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::queue::{DispatchQueue, Task};
use crate::request::{Phase, Request, SubmitError};
use crate::retry::RetryDecision;

/// Accepts requests and runs them on a network queue.
///
/// Cloning yields another handle to the same manager. Dropping the last
/// handle cancels every tracked request; requests waiting for a retry are
/// finalized as cancelled right away.
#[derive(Clone)]
pub struct RequestManager {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Arc<dyn DispatchQueue>,
    active: Mutex<HashMap<u64, Arc<Request>>>,
}

impl RequestManager {
    pub fn new(queue: Arc<dyn DispatchQueue>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The network queue attempts run on.
    pub fn queue(&self) -> &Arc<dyn DispatchQueue> {
        &self.inner.queue
    }

    /// Queue the first attempt of `request`. Never blocks on I/O.
    ///
    /// If the queue is already closed the request is finalized as cancelled
    /// (its listener hears `on_cancel`) and the error is returned.
    pub fn submit(&self, request: Arc<Request>) -> Result<(), SubmitError> {
        let id = request.id();
        request
            .transition(Phase::submit)
            .map_err(|_| SubmitError::AlreadySubmitted(id))?;
        self.inner.track(&request);
        tracing::debug!(
            request = id,
            queue = self.inner.queue.name(),
            "submitting {} {}",
            request.method(),
            request.url()
        );
        self.inner
            .queue
            .dispatch_async(AttemptTask::new(&self.inner, &request).into_task())?;
        Ok(())
    }

    /// Cancel every tracked request. Does not wait for in-flight attempts;
    /// each one finishes at its next checkpoint and reports `on_cancel`.
    /// Requests waiting for a retry report `on_cancel` right away.
    pub fn cancel_all(&self) {
        let active: Vec<Arc<Request>> = self.inner.active().values().cloned().collect();
        tracing::debug!(count = active.len(), "cancelling all requests");
        for request in &active {
            request.cancel();
            if request.transition(Phase::abandon_retry).is_ok() {
                self.inner.untrack(request.id());
                notify(request);
            }
        }
    }

    /// Number of submitted requests that have not reached a terminal state.
    pub fn in_flight(&self) -> usize {
        self.inner.active().len()
    }
}

impl Inner {
    fn active(&self) -> MutexGuard<'_, HashMap<u64, Arc<Request>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, request: &Arc<Request>) {
        self.active().insert(request.id(), Arc::clone(request));
    }

    fn untrack(&self, id: u64) {
        self.active().remove(&id);
    }

    /// Mark the request done, stop tracking it and notify its listener.
    fn finalize(&self, request: &Arc<Request>) {
        self.untrack(request.id());
        finalize_untracked(request);
    }

    /// After an attempt: schedule a retry if the request failed and its
    /// policy approves. Returns false when the request should be finalized.
    fn schedule_retry(self: &Arc<Self>, request: &Arc<Request>) -> bool {
        if !request.is_failed() {
            return false;
        }
        let retries = request.retry_attempt_count();
        let status = request.response_code();
        let delay = match request.retry_policy().decide(retries, status) {
            RetryDecision::RetryAfter(delay) => delay,
            RetryDecision::NoRetry => {
                tracing::debug!(request = request.id(), status, retries, "no retry for request");
                return false;
            }
        };
        // A cancel racing with the decision still wins: the retry attempt
        // stops at its first checkpoint.
        if request.is_cancelled() || request.transition(Phase::schedule_retry).is_err() {
            return false;
        }
        let attempt = request.mark_retrying();
        tracing::debug!(
            request = request.id(),
            status,
            attempt,
            "retrying request in {:?}",
            delay
        );

        // On a closed queue the rejected task finalizes the request itself.
        if let Err(e) = self
            .queue
            .dispatch_after(delay, AttemptTask::new(self, request).into_task())
        {
            tracing::warn!(request = request.id(), "cannot schedule retry: {}", e);
        }
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let active: Vec<Arc<Request>> = self
            .active
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, r)| r)
            .collect();
        for request in active {
            request.cancel();
            if matches!(request.phase(), Phase::Pending | Phase::AwaitingRetry) {
                finalize_untracked(&request);
            }
        }
    }
}

fn finalize_untracked(request: &Arc<Request>) {
    if request.transition(Phase::complete).is_ok() {
        notify(request);
    }
}

fn notify(request: &Arc<Request>) {
    tracing::debug!(request = request.id(), outcome = ?request.outcome(), "request finished");
    request.finish();
}

/// One queued attempt of a request.
///
/// A queue that drops the task without running it (shutdown, a stopped
/// runtime, a rejected dispatch) cancels and finalizes the request instead,
/// so its listener still hears exactly one outcome.
struct AttemptTask {
    manager: Weak<Inner>,
    request: Option<Arc<Request>>,
}

impl AttemptTask {
    fn new(manager: &Arc<Inner>, request: &Arc<Request>) -> Self {
        Self {
            manager: Arc::downgrade(manager),
            request: Some(Arc::clone(request)),
        }
    }

    fn into_task(mut self) -> Task {
        Box::new(move || {
            if let Some(request) = self.request.take() {
                run_attempt(&self.manager, &request);
            }
        })
    }
}

impl Drop for AttemptTask {
    fn drop(&mut self) {
        let Some(request) = self.request.take() else {
            return;
        };
        tracing::debug!(request = request.id(), "queued attempt dropped without running");
        request.cancel();
        match self.manager.upgrade() {
            Some(manager) => manager.finalize(&request),
            None => finalize_untracked(&request),
        }
    }
}

/// One network-queue task: run an attempt, then retry or finalize.
fn run_attempt(manager: &Weak<Inner>, request: &Arc<Request>) {
    let Some(manager) = manager.upgrade() else {
        // Manager gone while this task was queued.
        request.cancel();
        finalize_untracked(request);
        return;
    };
    if let Err(phase) = request.transition(Phase::begin_attempt) {
        // Already finalized by cancel_all while the retry was waiting.
        tracing::debug!(request = request.id(), ?phase, "attempt not started");
        return;
    }
    request.send_sync();
    if manager.schedule_retry(request) {
        return;
    }
    manager.finalize(request);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueClosed, SerialQueue, Task};
    use crate::request::{RequestDefaults, RequestFactory};
    use std::time::Duration;

    struct ClosedQueue;

    impl DispatchQueue for ClosedQueue {
        fn name(&self) -> &str {
            "closed"
        }

        fn dispatch_after(&self, _delay: Duration, _task: Task) -> Result<(), QueueClosed> {
            Err(QueueClosed("closed".into()))
        }
    }

    fn factory() -> RequestFactory {
        RequestFactory::new(RequestDefaults::default())
    }

    #[test]
    fn submit_to_closed_queue_finalizes_as_cancelled() {
        let manager = RequestManager::new(Arc::new(ClosedQueue));
        let r = factory().request("http://example.test/").build().unwrap();
        assert!(matches!(
            manager.submit(Arc::clone(&r)),
            Err(SubmitError::QueueClosed(_))
        ));
        assert_eq!(r.phase(), Phase::Done);
        assert!(r.is_cancelled());
        assert_eq!(manager.in_flight(), 0);
    }

    #[test]
    fn double_submit_is_rejected() {
        let queue = Arc::new(SerialQueue::new("test-double-submit").unwrap());
        let manager = RequestManager::new(queue);
        let r = factory().request("http://example.test/").build().unwrap();
        r.cancel();
        manager.submit(Arc::clone(&r)).unwrap();
        assert!(matches!(
            manager.submit(Arc::clone(&r)),
            Err(SubmitError::AlreadySubmitted(id)) if id == r.id()
        ));
    }
}

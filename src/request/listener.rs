//! Outcome notification.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::{Outcome, Request};

/// Receives the terminal outcome of a request. Exactly one method is called,
/// exactly once, after the last attempt.
///
/// All methods default to doing nothing, so implementors only override the
/// outcomes they care about.
pub trait RequestListener: Send + Sync {
    fn on_finish(&self, _request: &Request) {}

    fn on_cancel(&self, _request: &Request) {}

    fn on_fail(&self, _request: &Request, _reason: &str) {}
}

impl Request {
    /// Deliver the outcome to the listener: on the callback queue when one is
    /// configured, otherwise on the calling thread. Later calls are ignored.
    pub(crate) fn finish(self: &Arc<Self>) {
        if self.notified.swap(true, Ordering::AcqRel) {
            tracing::warn!(request = self.id, "request already finished");
            return;
        }
        match &self.callback_queue {
            Some(queue) => {
                let request = Arc::clone(self);
                if let Err(e) = queue.dispatch_async(Box::new(move || request.notify_listener())) {
                    tracing::warn!(request = self.id, "{}; notifying from current thread", e);
                    self.notify_listener();
                }
            }
            None => self.notify_listener(),
        }
    }

    fn notify_listener(&self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };
        let outcome = self.outcome();
        let result = catch_unwind(AssertUnwindSafe(|| match outcome {
            Outcome::Success => listener.on_finish(self),
            Outcome::Cancelled => listener.on_cancel(self),
            Outcome::Failed => {
                let reason = self.failure_reason();
                listener.on_fail(self, &reason)
            }
        }));
        if result.is_err() {
            tracing::error!(request = self.id, ?outcome, "request listener panicked");
        }
    }
}

//! A single HTTP request and its outcome state.
//!
//! A [`Request`] carries immutable configuration (URL, method, timeouts,
//! headers, retry policy, hooks, listener) and mutable outcome state written
//! by the network queue. One call to [`Request::send_sync`] is one attempt;
//! the [`RequestManager`](crate::manager::RequestManager) decides whether to
//! run another.

mod builder;
mod cancel;
mod error;
mod listener;
mod phase;
mod send;

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::queue::DispatchQueue;
use crate::retry::{is_success, RetryPolicy};
use crate::transport::{Connector, Method, ResponseHeaders};

pub use builder::{
    default_retry_policy, BodyProducer, RequestBuilder, RequestDefaults, RequestFactory,
    ResponseConsumer,
};
pub use cancel::CancellationToken;
pub use error::{BuildError, RequestError, SubmitError};
pub use listener::RequestListener;
pub use phase::Phase;

/// Terminal classification of a request. Exactly one applies at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Last attempt returned a 2xx status.
    Success,
    /// Cancellation was requested; any response is discarded.
    Cancelled,
    /// Neither successful nor cancelled.
    Failed,
}

/// Caller-supplied hooks for producing the body and consuming the response.
#[derive(Default)]
pub struct RequestHooks {
    pub produce_body: Option<BodyProducer>,
    pub consume_response: Option<ResponseConsumer>,
}

/// Outcome state of the most recent attempt.
#[derive(Debug, Default)]
struct Exchange {
    status: i32,
    body: Option<String>,
    headers: ResponseHeaders,
    error: Option<String>,
    retry_attempts: u32,
    retrying: bool,
}

/// An asynchronous HTTP request.
///
/// Built with [`Request::builder`] or [`RequestFactory::request`], shared as
/// `Arc<Request>` between the caller, the manager and the queues.
pub struct Request {
    id: u64,
    name: Option<String>,
    url: url::Url,
    method: Method,
    connect_timeout: Duration,
    read_timeout: Duration,
    headers: Vec<(String, String)>,
    retry_policy: Arc<dyn RetryPolicy>,
    connector: Arc<dyn Connector>,
    hooks: RequestHooks,
    listener: Option<Arc<dyn RequestListener>>,
    callback_queue: Option<Arc<dyn DispatchQueue>>,
    cancel: CancellationToken,
    exchange: Mutex<Exchange>,
    phase: Mutex<Phase>,
    notified: AtomicBool,
}

impl Request {
    /// Start building a request with ids and defaults from the process-wide
    /// [`RequestFactory`].
    pub fn builder(url: impl Into<String>) -> RequestBuilder {
        RequestFactory::global().request(url)
    }

    fn exchange(&self) -> MutexGuard<'_, Exchange> {
        self.exchange.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Request headers in insertion order (names are unique ignoring case).
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn retry_policy(&self) -> &Arc<dyn RetryPolicy> {
        &self.retry_policy
    }

    /// Status of the last attempt: 0 before any attempt, negative for a
    /// local failure.
    pub fn response_code(&self) -> i32 {
        self.exchange().status
    }

    /// Decoded body of the last response (success or error).
    pub fn response_body(&self) -> Option<String> {
        self.exchange().body.clone()
    }

    pub fn response_headers(&self) -> ResponseHeaders {
        self.exchange().headers.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.exchange().error.clone()
    }

    /// Number of retries scheduled so far. Never decreases.
    pub fn retry_attempt_count(&self) -> u32 {
        self.exchange().retry_attempts
    }

    /// True while a retry is scheduled but has not started yet.
    pub fn is_retrying(&self) -> bool {
        self.exchange().retrying
    }

    /// A handle to this request's cancellation flag.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation. Safe from any thread, including while an attempt
    /// is in flight: no further I/O step starts and no retry is scheduled.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(request = self.id, "cancelling request");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn outcome(&self) -> Outcome {
        if self.is_cancelled() {
            Outcome::Cancelled
        } else if is_success(self.response_code()) {
            Outcome::Success
        } else {
            Outcome::Failed
        }
    }

    pub fn is_successful(&self) -> bool {
        self.outcome() == Outcome::Success
    }

    pub fn is_failed(&self) -> bool {
        self.outcome() == Outcome::Failed
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a phase transition atomically. Returns the new phase, or the
    /// unchanged current phase when the transition is not allowed.
    pub(crate) fn transition(&self, step: impl FnOnce(Phase) -> Option<Phase>) -> Result<Phase, Phase> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match step(*phase) {
            Some(next) => {
                *phase = next;
                Ok(next)
            }
            None => Err(*phase),
        }
    }

    /// Record that a retry was scheduled.
    pub(crate) fn mark_retrying(&self) -> u32 {
        let mut ex = self.exchange();
        ex.retry_attempts = ex.retry_attempts.saturating_add(1);
        ex.retrying = true;
        ex.retry_attempts
    }

    fn failure_reason(&self) -> String {
        let ex = self.exchange();
        ex.error
            .clone()
            .unwrap_or_else(|| format!("request failed with status {}", ex.status))
    }

    /// Test hook: pretend an attempt produced `status`.
    #[cfg(test)]
    pub(crate) fn set_response_code(&self, status: i32) {
        self.exchange().status = status;
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ex = self.exchange();
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("status", &ex.status)
            .field("error", &ex.error)
            .field("retry_attempts", &ex.retry_attempts)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

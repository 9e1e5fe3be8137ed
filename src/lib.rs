//! Asynchronous HTTP request dispatch.
//!
//! Requests are built with [`Request::builder`], submitted to a
//! [`RequestManager`] and executed on a [`DispatchQueue`] off the caller's
//! thread. Failed attempts are retried according to the request's
//! [`RetryPolicy`]; the outcome is reported exactly once to a
//! [`RequestListener`], optionally on a separate callback queue.

pub mod config;
pub mod logging;

pub mod manager;
pub mod queue;
pub mod request;
pub mod retry;
pub mod transport;

pub use manager::RequestManager;
pub use queue::{DispatchQueue, RuntimeQueue, SerialQueue};
pub use request::{
    CancellationToken, Outcome, Request, RequestBuilder, RequestDefaults, RequestFactory,
    RequestListener,
};
pub use retry::{BackoffPolicy, RetryLimit, RetryPolicy};
pub use transport::Method;

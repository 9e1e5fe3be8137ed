//! Retry and backoff policy.
//!
//! Status classification (timeouts, throttling, transport failures) and
//! exponential backoff decisions live here so the request manager and any
//! custom policy share the same vocabulary.

mod classify;
mod policy;

pub use classify::{classify_status, is_success, ErrorKind, TRANSPORT_FAILURE};
pub use policy::{BackoffPolicy, RetryDecision, RetryLimit, RetryPolicy};

#![allow(dead_code)]

pub mod http_server;
pub mod listener;
pub mod scripted;

use std::sync::Arc;
use std::time::Duration;

use httpdq::{BackoffPolicy, RetryLimit, RetryPolicy};

/// Backoff policy with tiny delays so retry tests run fast.
pub fn fast_policy(max_retries: RetryLimit) -> Arc<dyn RetryPolicy> {
    Arc::new(BackoffPolicy {
        max_retries,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    })
}

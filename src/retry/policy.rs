use std::time::Duration;

use super::classify::{classify_status, is_success, ErrorKind};

/// Upper bound on the number of retries a policy allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// At most this many retries after the first attempt.
    Limited(u32),
    /// Keep retrying until the request is cancelled.
    Unlimited,
}

impl RetryLimit {
    /// True once `retries` retries have used up the limit.
    pub fn is_exhausted(self, retries: u32) -> bool {
        match self {
            RetryLimit::Limited(max) => retries >= max,
            RetryLimit::Unlimited => false,
        }
    }
}

/// Decision returned by a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry; the request is finalized.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Stateless rule set deciding if and when a failed attempt is retried.
///
/// Implementations are shared between requests (`Arc<dyn RetryPolicy>`) and
/// must not carry per-request state.
pub trait RetryPolicy: Send + Sync {
    /// Whether a failed attempt with this status is worth retrying at all.
    fn should_retry(&self, status: i32) -> bool;

    /// Maximum number of retries (not counting the first attempt).
    fn max_retry_count(&self) -> RetryLimit;

    /// Delay before retry number `attempt` (1-based). Must be non-decreasing.
    fn retry_delay(&self, attempt: u32) -> Duration;

    /// Combine the limit, the status check and the backoff.
    ///
    /// `retries_so_far` is the number of retries already scheduled for the
    /// request; the returned delay is for retry number `retries_so_far + 1`.
    fn decide(&self, retries_so_far: u32, status: i32) -> RetryDecision {
        if self.max_retry_count().is_exhausted(retries_so_far) {
            return RetryDecision::NoRetry;
        }
        if !self.should_retry(status) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.retry_delay(retries_so_far.saturating_add(1)))
    }
}

/// Exponential backoff policy with caps.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: RetryLimit,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: RetryLimit::Limited(4),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, status: i32) -> bool {
        if is_success(status) {
            return false;
        }
        match classify_status(status) {
            ErrorKind::Other => false,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => true,
        }
    }

    fn max_retry_count(&self) -> RetryLimit {
        self.max_retries
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        // base * 2^(attempt-1), capped.
        let exp = 1u32 << attempt.saturating_sub(1).min(8);
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_for_success_or_client_errors() {
        let p = BackoffPolicy::default();
        assert!(!p.should_retry(200));
        assert!(!p.should_retry(204));
        assert!(!p.should_retry(400));
        assert!(!p.should_retry(404));
        assert_eq!(p.decide(0, 404), RetryDecision::NoRetry);
    }

    #[test]
    fn retries_server_and_transport_failures() {
        let p = BackoffPolicy::default();
        assert!(p.should_retry(500));
        assert!(p.should_retry(503));
        assert!(p.should_retry(429));
        assert!(p.should_retry(-1));
    }

    #[test]
    fn exponential_backoff_grows_and_is_capped() {
        let p = BackoffPolicy {
            max_retries: RetryLimit::Unlimited,
            ..BackoffPolicy::default()
        };
        let d1 = p.retry_delay(1);
        let d2 = p.retry_delay(2);
        assert_eq!(d1, p.base_delay);
        assert_eq!(d2, p.base_delay * 2);
        let mut prev = Duration::ZERO;
        for attempt in 1..40 {
            let d = p.retry_delay(attempt);
            assert!(d >= prev);
            assert!(d <= p.max_delay);
            prev = d;
        }
        assert_eq!(p.retry_delay(30), p.max_delay);
    }

    #[test]
    fn respects_max_retries() {
        let p = BackoffPolicy {
            max_retries: RetryLimit::Limited(2),
            ..BackoffPolicy::default()
        };
        assert!(matches!(p.decide(0, 503), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(1, 503), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(2, 503), RetryDecision::NoRetry);
    }

    #[test]
    fn unlimited_never_exhausts() {
        assert!(!RetryLimit::Unlimited.is_exhausted(u32::MAX));
        assert!(RetryLimit::Limited(0).is_exhausted(0));
        let p = BackoffPolicy {
            max_retries: RetryLimit::Unlimited,
            ..BackoffPolicy::default()
        };
        assert!(matches!(p.decide(10_000, 500), RetryDecision::RetryAfter(_)));
    }

    #[test]
    fn decide_uses_next_attempt_for_delay() {
        let p = BackoffPolicy::default();
        assert_eq!(p.decide(0, 500), RetryDecision::RetryAfter(p.retry_delay(1)));
        assert_eq!(p.decide(2, 500), RetryDecision::RetryAfter(p.retry_delay(3)));
    }
}

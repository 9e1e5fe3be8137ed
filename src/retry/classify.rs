//! Classify response status codes into retry error kinds.

/// Status recorded when an attempt fails before a response status is known
/// (DNS, connect, I/O, decode or hook failure).
pub const TRANSPORT_FAILURE: i32 = -1;

/// High-level classification of a failed attempt for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server reported a request timeout (408).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Local failure: no status was received.
    Connection,
    /// Retryable server error that is not throttling.
    Http5xx(u16),
    /// Anything else (typically not retried).
    Other,
}

/// True when `status` is in `[200, 300)`.
pub fn is_success(status: i32) -> bool {
    (200..300).contains(&status)
}

/// Classify a response status (or a non-positive local failure sentinel).
pub fn classify_status(status: i32) -> ErrorKind {
    match status {
        i32::MIN..=0 => ErrorKind::Connection,
        408 => ErrorKind::Timeout,
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(status as u16),
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_status(429), ErrorKind::Throttled);
        assert_eq!(classify_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert_eq!(classify_status(500), ErrorKind::Http5xx(500));
        assert_eq!(classify_status(502), ErrorKind::Http5xx(502));
    }

    #[test]
    fn local_failures_are_connection_errors() {
        assert_eq!(classify_status(TRANSPORT_FAILURE), ErrorKind::Connection);
        assert_eq!(classify_status(0), ErrorKind::Connection);
    }

    #[test]
    fn client_errors_and_redirects_are_other() {
        assert_eq!(classify_status(404), ErrorKind::Other);
        assert_eq!(classify_status(403), ErrorKind::Other);
        assert_eq!(classify_status(304), ErrorKind::Other);
        assert_eq!(classify_status(408), ErrorKind::Timeout);
    }

    #[test]
    fn success_range_is_half_open() {
        assert!(!is_success(199));
        assert!(is_success(200));
        assert!(is_success(299));
        assert!(!is_success(300));
    }
}

//! RAII guard that disconnects a connection when dropped.

use std::ops::{Deref, DerefMut};

use super::Connection;

/// Owns a connection for the duration of one attempt and disconnects it on
/// drop, whichever way the attempt exits.
pub struct ConnectionGuard {
    conn: Box<dyn Connection>,
}

impl ConnectionGuard {
    pub fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn }
    }
}

impl Deref for ConnectionGuard {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref()
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.conn.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ResponseHeaders, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl Connection for Counting {
        fn send(&mut self, _body: Option<&[u8]>) -> Result<i32, TransportError> {
            Err(TransportError::Other("refused".into()))
        }
        fn reason_phrase(&self) -> Option<&str> {
            None
        }
        fn response_headers(&self) -> ResponseHeaders {
            ResponseHeaders::default()
        }
        fn read_body(&mut self) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::NotSent)
        }
        fn disconnect(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn failing_send(guard: &mut ConnectionGuard) -> Result<i32, TransportError> {
        let status = guard.send(None)?;
        Ok(status)
    }

    #[test]
    fn disconnects_once_on_error_path() {
        let closed = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = ConnectionGuard::new(Box::new(Counting(Arc::clone(&closed))));
            assert!(failing_send(&mut guard).is_err());
            assert_eq!(closed.load(Ordering::SeqCst), 0);
        }
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}

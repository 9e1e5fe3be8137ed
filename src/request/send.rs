//! One attempt: open, send, read, decode, hand off.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::retry::{is_success, TRANSPORT_FAILURE};
use crate::transport::{canonical_reason, decode_body, ConnectionGuard, ConnectionSpec};

use super::{Exchange, Request, RequestError};

impl Request {
    /// Execute one full attempt on the calling thread.
    ///
    /// Cancellation is checked before connecting, after the connection is
    /// opened, after the status arrives and before the response hook runs.
    /// Errors never escape: they are recorded as a [`TRANSPORT_FAILURE`]
    /// status with the error text, and logged unless the request was
    /// cancelled. A panic in a hook or connector is recorded the same way.
    /// Retrying is the manager's decision.
    pub fn send_sync(&self) {
        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| self.perform()))
            .unwrap_or_else(|payload| Err(RequestError::Panicked(panic_message(payload.as_ref()))));
        if let Err(e) = result {
            {
                let mut ex = self.exchange();
                ex.status = TRANSPORT_FAILURE;
                ex.error = Some(e.to_string());
            }
            if !self.is_cancelled() {
                tracing::error!(request = self.id, url = %self.url, "unable to perform request: {}", e);
            }
        }
        tracing::debug!(
            request = self.id,
            "request finished in {} ms",
            started.elapsed().as_millis()
        );
    }

    fn perform(&self) -> Result<(), RequestError> {
        {
            let mut ex = self.exchange();
            let retries = ex.retry_attempts;
            *ex = Exchange {
                retry_attempts: retries,
                ..Exchange::default()
            };
        }
        if self.is_cancelled() {
            return Ok(());
        }
        tracing::debug!(
            request = self.id,
            name = self.name.as_deref().unwrap_or("-"),
            "performing request: {} {}",
            self.method,
            self.url
        );

        let spec = ConnectionSpec {
            url: &self.url,
            method: self.method,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            headers: &self.headers,
        };
        let mut conn = ConnectionGuard::new(self.connector.open(&spec)?);
        if self.is_cancelled() {
            return Ok(());
        }

        let body = if self.method.has_body() {
            self.create_body()?
        } else {
            None
        };
        let status = conn.send(body.as_deref())?;
        self.exchange().status = status;
        if self.is_cancelled() {
            return Ok(());
        }

        let headers = conn.response_headers();
        let gzipped = headers.is_gzip();
        self.exchange().headers = headers;

        let raw = conn.read_body()?;
        let text = decode_body(&raw, gzipped).map_err(RequestError::Decode)?;
        if is_success(status) {
            tracing::trace!(request = self.id, "response: {}", text);
        } else {
            let reason = conn
                .reason_phrase()
                .unwrap_or_else(|| canonical_reason(status));
            let message = format!("Unexpected response code: {} ({})", status, reason);
            tracing::warn!(request = self.id, "{}; response: {}", message, text);
            self.exchange().error = Some(message);
        }
        self.exchange().body = Some(text.clone());

        if self.is_cancelled() {
            return Ok(());
        }
        if let Some(consume) = &self.hooks.consume_response {
            consume(&text).map_err(RequestError::Response)?;
        }
        Ok(())
    }

    fn create_body(&self) -> Result<Option<Vec<u8>>, RequestError> {
        let Some(produce) = &self.hooks.produce_body else {
            return Ok(None);
        };
        let body = produce().map_err(RequestError::Body)?;
        Ok(body.filter(|b| !b.is_empty()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Connection seam between a request attempt and the network.
//!
//! An attempt asks a [`Connector`] for a fresh [`Connection`], drives it
//! through send / headers / body, and releases it through a
//! [`ConnectionGuard`] on every exit path. [`CurlConnector`] is the libcurl
//! implementation used by default; tests substitute scripted doubles.

mod decode;
mod guard;
mod headers;
mod libcurl;

use std::fmt;
use std::time::Duration;

pub use decode::decode_body;
pub use guard::ConnectionGuard;
pub use headers::{canonical_reason, ResponseHeaders};
pub use libcurl::CurlConnector;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }

    /// Methods that carry a request body.
    pub fn has_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a connection. They end the attempt and are recorded as
/// a transport failure on the request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("response not available before the request was sent")]
    NotSent,
    #[error("{0}")]
    Other(String),
}

/// Everything a connector needs to open a connection for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSpec<'a> {
    pub url: &'a url::Url,
    pub method: Method,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub headers: &'a [(String, String)],
}

/// Opens connections. Shared between requests and queue threads.
pub trait Connector: Send + Sync {
    fn open(&self, spec: &ConnectionSpec<'_>) -> Result<Box<dyn Connection>, TransportError>;
}

/// One connection, exclusively owned by the attempt that opened it.
pub trait Connection: Send {
    /// Write `body` (if any), perform the exchange and return the status code.
    fn send(&mut self, body: Option<&[u8]>) -> Result<i32, TransportError>;

    /// Reason phrase of the final status line, when the server sent one.
    fn reason_phrase(&self) -> Option<&str>;

    /// Response headers of the final response.
    fn response_headers(&self) -> ResponseHeaders;

    /// Raw (possibly compressed) body of the response, success or error.
    fn read_body(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Release the underlying resources. Called exactly once by the guard.
    fn disconnect(&mut self);
}

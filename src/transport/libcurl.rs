//! libcurl-backed connections (one `Easy` handle per attempt).

use std::str;

use curl::easy::{Easy, List};

use super::{Connection, ConnectionSpec, Connector, Method, ResponseHeaders, TransportError};

/// Default connector: opens a fresh libcurl `Easy` handle for every attempt.
///
/// Redirects are followed. `read_timeout` maps to libcurl's low-speed abort
/// (less than 1 byte/s for that long). Compressed bodies are delivered as-is
/// and inflated by the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlConnector;

impl Connector for CurlConnector {
    fn open(&self, spec: &ConnectionSpec<'_>) -> Result<Box<dyn Connection>, TransportError> {
        let mut easy = Easy::new();
        easy.url(spec.url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(spec.connect_timeout)?;
        easy.low_speed_limit(1)?;
        easy.low_speed_time(spec.read_timeout)?;
        match spec.method {
            Method::Get => easy.get(true)?,
            Method::Post => easy.post(true)?,
            Method::Put => {
                easy.post(true)?;
                easy.custom_request("PUT")?;
            }
        }

        // Build curl list for request headers ("Name: value").
        if !spec.headers.is_empty() {
            let mut list = List::new();
            for (k, v) in spec.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }

        Ok(Box::new(CurlConnection {
            easy: Some(easy),
            method: spec.method,
            sent: false,
            reason: None,
            headers: ResponseHeaders::default(),
            body: Vec::new(),
        }))
    }
}

struct CurlConnection {
    easy: Option<Easy>,
    method: Method,
    sent: bool,
    reason: Option<String>,
    headers: ResponseHeaders,
    body: Vec<u8>,
}

impl Connection for CurlConnection {
    fn send(&mut self, body: Option<&[u8]>) -> Result<i32, TransportError> {
        let easy = self
            .easy
            .as_mut()
            .ok_or_else(|| TransportError::Other("connection already closed".into()))?;
        if self.method.has_body() {
            easy.post_fields_copy(body.unwrap_or_default())?;
        }

        let mut header_lines: Vec<String> = Vec::new();
        let mut received: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                received.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        let (reason, headers) = ResponseHeaders::parse_lines(&header_lines);
        self.reason = reason;
        self.headers = headers;
        self.body = received;
        self.sent = true;
        Ok(i32::try_from(code).unwrap_or(i32::MAX))
    }

    fn reason_phrase(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    fn response_headers(&self) -> ResponseHeaders {
        self.headers.clone()
    }

    fn read_body(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.sent {
            return Err(TransportError::NotSent);
        }
        Ok(std::mem::take(&mut self.body))
    }

    fn disconnect(&mut self) {
        // Dropping the handle closes its connection.
        self.easy = None;
        self.body.clear();
    }
}

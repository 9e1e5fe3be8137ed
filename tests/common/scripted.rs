//! Connector double that replays scripted statuses and records attempts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpdq::transport::{
    Connection, ConnectionSpec, Connector, ResponseHeaders, TransportError,
};

/// One scripted reply; the last one repeats once the script is exhausted.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(i32),
    Refuse,
}

#[derive(Default)]
struct Tracker {
    attempts: AtomicUsize,
    active_per_url: Mutex<HashMap<String, usize>>,
    max_overlap: AtomicUsize,
}

pub struct ScriptedConnector {
    script: Vec<Reply>,
    send_delay: Duration,
    tracker: Arc<Tracker>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    /// Each send sleeps for `send_delay`, widening the window in which two
    /// attempts of one request could overlap.
    pub fn with_delay(script: Vec<Reply>, send_delay: Duration) -> Arc<Self> {
        assert!(!script.is_empty());
        Arc::new(Self {
            script,
            send_delay,
            tracker: Arc::new(Tracker::default()),
        })
    }

    pub fn always(status: i32) -> Arc<Self> {
        Self::new(vec![Reply::Status(status)])
    }

    /// Total connections opened (one per attempt that got past the first
    /// cancellation checkpoint).
    pub fn attempts(&self) -> usize {
        self.tracker.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous sends observed for any single URL.
    pub fn max_overlap(&self) -> usize {
        self.tracker.max_overlap.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, spec: &ConnectionSpec<'_>) -> Result<Box<dyn Connection>, TransportError> {
        let n = self.tracker.attempts.fetch_add(1, Ordering::SeqCst);
        let reply = self.script[n.min(self.script.len() - 1)].clone();
        Ok(Box::new(ScriptedConnection {
            url: spec.url.to_string(),
            reply,
            send_delay: self.send_delay,
            tracker: Arc::clone(&self.tracker),
        }))
    }
}

struct ScriptedConnection {
    url: String,
    reply: Reply,
    send_delay: Duration,
    tracker: Arc<Tracker>,
}

impl Connection for ScriptedConnection {
    fn send(&mut self, _body: Option<&[u8]>) -> Result<i32, TransportError> {
        {
            let mut active = self.tracker.active_per_url.lock().unwrap();
            let count = active.entry(self.url.clone()).or_insert(0);
            *count += 1;
            self.tracker.max_overlap.fetch_max(*count, Ordering::SeqCst);
        }
        if !self.send_delay.is_zero() {
            std::thread::sleep(self.send_delay);
        }
        if let Some(count) = self.tracker.active_per_url.lock().unwrap().get_mut(&self.url) {
            *count -= 1;
        }
        match self.reply {
            Reply::Status(status) => Ok(status),
            Reply::Refuse => Err(TransportError::Other("connection refused".into())),
        }
    }

    fn reason_phrase(&self) -> Option<&str> {
        None
    }

    fn response_headers(&self) -> ResponseHeaders {
        ResponseHeaders::new()
    }

    fn read_body(&mut self) -> Result<Vec<u8>, TransportError> {
        Ok(Vec::new())
    }

    fn disconnect(&mut self) {}
}

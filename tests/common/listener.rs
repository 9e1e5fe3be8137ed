//! Listener that records every callback and lets tests wait for the outcome.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

use httpdq::{Request, RequestListener};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Finish,
    Cancel,
    Fail(String),
}

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(Event, ThreadId)>>,
    changed: Condvar,
    panic_on_callback: bool,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A recorder whose callbacks panic after recording.
    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            panic_on_callback: true,
            ..Self::default()
        })
    }

    fn record(&self, event: Event) {
        self.events
            .lock()
            .unwrap()
            .push((event, std::thread::current().id()));
        self.changed.notify_all();
        if self.panic_on_callback {
            panic!("listener failure");
        }
    }

    /// Wait until at least one event arrived and return the first one.
    pub fn wait(&self, timeout: Duration) -> Option<Event> {
        let guard = self.events.lock().unwrap();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |events| events.is_empty())
            .unwrap();
        guard.first().map(|(e, _)| e.clone())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.events.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl RequestListener for Recorder {
    fn on_finish(&self, _request: &Request) {
        self.record(Event::Finish);
    }

    fn on_cancel(&self, _request: &Request) {
        self.record(Event::Cancel);
    }

    fn on_fail(&self, _request: &Request, reason: &str) {
        self.record(Event::Fail(reason.to_string()));
    }
}

//! Request construction: builder, shared defaults and id allocation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::queue::DispatchQueue;
use crate::retry::{BackoffPolicy, RetryPolicy};
use crate::transport::{Connector, CurlConnector, Method};

use super::{
    BuildError, CancellationToken, Exchange, Phase, Request, RequestHooks, RequestListener,
};

/// Produces the request body on the network queue (POST/PUT only).
pub type BodyProducer = Box<dyn Fn() -> anyhow::Result<Option<Vec<u8>>> + Send + Sync>;

/// Consumes the decoded response text after a full read.
pub type ResponseConsumer = Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(45);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(45);

/// The retry policy shared by every request that does not set its own.
pub fn default_retry_policy() -> Arc<dyn RetryPolicy> {
    static DEFAULT: OnceLock<Arc<dyn RetryPolicy>> = OnceLock::new();
    Arc::clone(DEFAULT.get_or_init(|| Arc::new(BackoffPolicy::default())))
}

/// Settings applied to every request built by a factory unless overridden.
#[derive(Clone)]
pub struct RequestDefaults {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub retry_policy: Arc<dyn RetryPolicy>,
    pub connector: Arc<dyn Connector>,
    pub callback_queue: Option<Arc<dyn DispatchQueue>>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            retry_policy: default_retry_policy(),
            connector: Arc::new(CurlConnector),
            callback_queue: None,
        }
    }
}

/// Allocates request ids and hands out builders preloaded with defaults.
///
/// Ids are unique per factory and strictly increasing in allocation order.
/// Most programs use the process-wide factory behind [`Request::builder`];
/// call [`RequestFactory::init_global`] once at startup to configure it.
pub struct RequestFactory {
    next_id: AtomicU64,
    defaults: RequestDefaults,
}

static GLOBAL_FACTORY: OnceLock<RequestFactory> = OnceLock::new();

impl RequestFactory {
    pub fn new(defaults: RequestDefaults) -> Self {
        Self::with_first_id(1, defaults)
    }

    pub fn with_first_id(first_id: u64, defaults: RequestDefaults) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
            defaults,
        }
    }

    /// Install the process-wide factory. Fails (returning the factory) if
    /// the global factory was already installed or already used.
    pub fn init_global(factory: RequestFactory) -> Result<(), RequestFactory> {
        GLOBAL_FACTORY.set(factory)
    }

    /// The process-wide factory; created with defaults on first use if
    /// [`RequestFactory::init_global`] was never called.
    pub fn global() -> &'static RequestFactory {
        GLOBAL_FACTORY.get_or_init(|| RequestFactory::new(RequestDefaults::default()))
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Start a request to `url`; the id is allocated now.
    pub fn request(&self, url: impl Into<String>) -> RequestBuilder {
        let d = &self.defaults;
        RequestBuilder {
            id: self.allocate_id(),
            url: url.into(),
            name: None,
            method: Method::Get,
            connect_timeout: d.connect_timeout,
            read_timeout: d.read_timeout,
            headers: Vec::new(),
            retry_policy: Arc::clone(&d.retry_policy),
            connector: Arc::clone(&d.connector),
            hooks: RequestHooks::default(),
            listener: None,
            callback_queue: d.callback_queue.clone(),
            cancel: None,
        }
    }
}

/// Builder for [`Request`].
pub struct RequestBuilder {
    id: u64,
    url: String,
    name: Option<String>,
    method: Method,
    connect_timeout: Duration,
    read_timeout: Duration,
    headers: Vec<(String, String)>,
    retry_policy: Arc<dyn RetryPolicy>,
    connector: Arc<dyn Connector>,
    hooks: RequestHooks,
    listener: Option<Arc<dyn RequestListener>>,
    callback_queue: Option<Arc<dyn DispatchQueue>>,
    cancel: Option<CancellationToken>,
}

impl RequestBuilder {
    /// Human-readable name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set a request header. A later value for the same name (ignoring case)
    /// replaces the earlier one.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Body hook, called on the network queue before each POST/PUT attempt.
    /// `Ok(None)` or an empty body sends no payload.
    pub fn produce_body<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Option<Vec<u8>>> + Send + Sync + 'static,
    {
        self.hooks.produce_body = Some(Box::new(f));
        self
    }

    /// Fixed body bytes; shorthand for a `produce_body` hook.
    pub fn body(self, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        self.produce_body(move || Ok(Some(bytes.clone())))
    }

    /// Response hook, called with the decoded body text of every completed
    /// (success or error) response that was not cancelled.
    pub fn consume_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.consume_response = Some(Box::new(f));
        self
    }

    pub fn listener(mut self, listener: Arc<dyn RequestListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Queue on which the listener is called. Without one the listener runs
    /// on the network queue.
    pub fn callback_queue(mut self, queue: Arc<dyn DispatchQueue>) -> Self {
        self.callback_queue = Some(queue);
        self
    }

    /// Share an existing cancellation token instead of creating a new one.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<Arc<Request>, BuildError> {
        if self.url.trim().is_empty() {
            return Err(BuildError::EmptyUrl(self.url));
        }
        let url = url::Url::parse(self.url.trim()).map_err(|source| BuildError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        Ok(Arc::new(Request {
            id: self.id,
            name: self.name,
            url,
            method: self.method,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            headers: self.headers,
            retry_policy: self.retry_policy,
            connector: self.connector,
            hooks: self.hooks,
            listener: self.listener,
            callback_queue: self.callback_queue,
            cancel: self.cancel.unwrap_or_default(),
            exchange: Mutex::new(Exchange::default()),
            phase: Mutex::new(Phase::Created),
            notified: AtomicBool::new(false),
        }))
    }
}

//! Request error types.

use crate::queue::QueueClosed;
use crate::transport::TransportError;

/// Why a single attempt ended without a usable response. Recorded on the
/// request as a transport failure; never returned across the queue boundary.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode response body: {0}")]
    Decode(#[source] std::io::Error),
    #[error("failed to create request body: {0:#}")]
    Body(anyhow::Error),
    #[error("failed to handle response: {0:#}")]
    Response(anyhow::Error),
    #[error("request attempt panicked: {0}")]
    Panicked(String),
}

/// Errors raised while building a request.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid URL string '{0}'")]
    EmptyUrl(String),
    #[error("invalid URL string '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Errors raised by `RequestManager::submit`.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("request {0} was already submitted")]
    AlreadySubmitted(u64),
    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}

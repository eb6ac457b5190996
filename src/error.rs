use crate::diagnostics::redact_token;
use std::error::Error;

/// Why an event never made it into a batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    #[error("event JSON is {size} bytes, over the limit of {limit} bytes")]
    Oversized { size: usize, limit: usize },

    #[error("event could not be serialized: {0}")]
    Serialization(String),

    #[error("formatter panicked: {0}")]
    Panicked(String),
}

/// Error produced by an [`crate::transport::HttpTransport`] before any
/// status code was received (connect, TLS, timeout, ...).
#[derive(thiserror::Error, Debug)]
#[error("{source}")]
pub struct TransportError {
    #[source]
    pub source: Box<dyn Error + Send + Sync>,
}

impl TransportError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        TransportError { source: source.into() }
    }
}

/// A batch that could not be delivered. Handed to the failure callback.
///
/// `url` keeps the full listener URL; the `Display` output redacts its token.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error(
        "received failed result {status} when posting events to {}: {body}",
        redact_token(.url)
    )]
    Status { status: u16, url: String, body: String },

    #[error("failed to post events to {}: {source}", redact_token(.url))]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
}

impl DeliveryError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Status { status, .. } => Some(*status),
            DeliveryError::Transport { .. } => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            DeliveryError::Status { url, .. } | DeliveryError::Transport { url, .. } => url,
        }
    }
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] TransportError),
}

/// The dispatcher task has stopped and no longer accepts commands.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("log dispatcher is closed")]
pub struct DispatcherClosed;

use crate::error::TransportError;
use async_trait::async_trait;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpResponse { status, body: body.into() }
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network seam used by the dispatcher to ship a batch.
///
/// Implementations own whatever connection state they need (pools, TLS).
/// The dispatcher calls `post` from its background task, never from the
/// application thread, and calls `close` exactly once when it shuts down.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `body` to `url`.
    ///
    /// **Returns**
    /// - `Ok(response)` whenever the server answered, whatever the status.
    /// - `Err(..)` if no response was received (connect, TLS, timeout).
    async fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<HttpResponse, TransportError>;

    /// Release resources held by the transport.
    ///
    /// Default implementation is a no-op.
    async fn close(&self) {}
}

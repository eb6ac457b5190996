use crate::error::TransportError;
use crate::transport::{HttpResponse, HttpTransport};
use async_trait::async_trait;

/// A transport that accepts every batch without sending it anywhere.
///
/// Useful for measuring the overhead of the layer and dispatcher without
/// any network I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl HttpTransport for NoopTransport {
    async fn post(
        &self,
        _url: &str,
        _body: Vec<u8>,
        _content_type: &str,
    ) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogzioConfig;
    use crate::dispatcher::Dispatcher;
    use crate::event::{Level, LogEvent};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn every_batch_counts_as_delivered() {
        let (handle, _task) = Dispatcher::spawn(LogzioConfig::new("tok", "bench"), NoopTransport);
        handle.enqueue(LogEvent::new(Level::Information, "nowhere"));
        handle.flush().await.unwrap();
        assert_eq!(handle.delivered_batches.load(Ordering::Relaxed), 1);
    }
}

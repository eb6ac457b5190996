//! Self-diagnostics of the sink.
//!
//! Everything the sink has to say about itself (dropped events, failed
//! deliveries, misconfiguration) is emitted as a `tracing` event under
//! [`TARGET`]. [`crate::layer::LogzioLayer`] never captures that target, so
//! diagnostics reach other layers (e.g. `fmt`) without looping back into
//! the sink.

use std::borrow::Cow;

/// `tracing` target used for all self-diagnostics.
pub const TARGET: &str = "tracing_logzio_sink::diagnostics";

/// Longest excerpt of a dropped document included in a diagnostic.
pub const MAX_EXCERPT_BYTES: usize = 256;

/// Cut `data` to at most [`MAX_EXCERPT_BYTES`] on a char boundary.
pub fn excerpt(data: &str) -> &str {
    if data.len() <= MAX_EXCERPT_BYTES {
        return data;
    }
    let mut end = MAX_EXCERPT_BYTES;
    while !data.is_char_boundary(end) {
        end -= 1;
    }
    &data[..end]
}

/// Replace the value of a `token` query parameter with `<redacted>`.
pub fn redact_token(url: &str) -> Cow<'_, str> {
    let Some(query_start) = url.find('?') else {
        return Cow::Borrowed(url);
    };
    let (base, query) = url.split_at(query_start + 1);
    if !query.split('&').any(|pair| pair.starts_with("token=")) {
        return Cow::Borrowed(url);
    }

    let query = query
        .split('&')
        .map(|pair| if pair.starts_with("token=") { "token=<redacted>" } else { pair })
        .collect::<Vec<_>>()
        .join("&");
    Cow::Owned(format!("{base}{query}"))
}

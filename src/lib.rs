//! Ship `tracing` events to Logz.io as batched JSON documents.
//!
//! Events are converted by [`layer::LogzioLayer`], queued on a bounded
//! channel and posted in batches by a background [`dispatcher::Dispatcher`].

pub mod event;
pub mod naming;
pub mod flatten;
pub mod formatter;
pub mod batch;

pub mod transport;
pub mod noop_transport;

#[cfg(feature = "http-client")]
pub mod http;

pub mod endpoint;
pub mod config;
pub mod env;
pub mod error;
pub mod diagnostics;
pub mod dispatcher;
pub mod layer;
pub mod init;

pub use config::LogzioConfig;
pub use dispatcher::{Dispatcher, DispatcherGuard, DispatcherHandle, DispatcherState};
pub use event::{ExceptionInfo, Level, LogEvent, PropertyValue, Scalar};
pub use formatter::{EventFormatter, FormattingOptions};
pub use layer::{LayerOptions, LogzioLayer};

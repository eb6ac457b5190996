use crate::config::LogzioConfig;
use crate::dispatcher::{Dispatcher, DispatcherGuard};
use crate::error::InitError;
use crate::layer::{LayerOptions, LogzioLayer};
use crate::transport::HttpTransport;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Options for the global subscriber installed by [`init_tracing_with_config`].
///
/// **Fields**
/// - `layer`: filtering applied by [`LogzioLayer`].
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is added
///   next to the Logz.io layer so events (and the sink's own diagnostics)
///   are also printed to the console.
#[derive(Clone, Debug)]
pub struct InitConfig {
    pub layer: LayerOptions,
    pub enable_stdout: bool,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            layer: LayerOptions::default(),
            enable_stdout: true,
        }
    }
}

/// Install the global `tracing` subscriber shipping through a custom
/// [`HttpTransport`].
///
/// **Parameters**
/// - `config`: sink configuration, validated by [`Dispatcher::spawn`].
/// - `transport`: HTTP client the dispatcher posts batches with.
/// - `init`: [`InitConfig`] controlling filtering and console output.
///
/// **Returns**
///
/// A [`DispatcherGuard`] for the spawned dispatcher. Keep it alive for the
/// life of the program. Dropping it starts the final flush; awaiting
/// [`DispatcherHandle::shutdown`](crate::dispatcher::DispatcherHandle::shutdown)
/// through it also waits for it, bounded by the configured
/// shutdown timeout.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_transport<T>(
    config: LogzioConfig,
    transport: T,
    init: InitConfig,
) -> Result<DispatcherGuard, InitError>
where
    T: HttpTransport + 'static,
{
    let (handle, _task) = Dispatcher::spawn(config, transport);
    let layer = LogzioLayer::new(handle.clone(), init.layer);

    if init.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(DispatcherGuard::new(handle))
}

/// Install the global subscriber shipping through the built-in `reqwest`
/// transport, with the request timeout taken from `config`.
#[cfg(feature = "http-client")]
pub fn init_tracing_with_config(
    config: LogzioConfig,
    init: InitConfig,
) -> Result<DispatcherGuard, InitError> {
    let transport = crate::http::ReqwestTransport::new(config.request_timeout)?;
    init_tracing_with_transport(config, transport, init)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`InitConfig::default`].
#[cfg(feature = "http-client")]
pub fn init_tracing(config: LogzioConfig) -> Result<DispatcherGuard, InitError> {
    init_tracing_with_config(config, InitConfig::default())
}

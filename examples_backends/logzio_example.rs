use tracing::{error, info, info_span};
use tracing_logzio_sink::{env::env_or, init::init_tracing, LogzioConfig};

#[derive(Debug, thiserror::Error)]
#[error("payment gateway timed out")]
struct GatewayTimeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // LOGZIO_TOKEN is required; LOGZIO_SUBDOMAIN=listener-eu etc. select the region.
    let config = LogzioConfig::from_env()?.with_failure_callback(|err| {
        eprintln!("logz.io delivery failed: {err}");
    });
    let guard = init_tracing(config)?;

    let environment = env_or("APP_ENV", "dev");
    info!(environment = %environment, "logzio example started");

    let span = info_span!("checkout", order_id = 1042);
    {
        let _entered = span.enter();
        let err = GatewayTimeout;
        error!(
            error = &err as &(dyn std::error::Error + 'static),
            amount = 19.99,
            "simulated checkout failure"
        );
    }

    guard.shutdown().await;
    Ok(())
}

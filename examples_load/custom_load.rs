use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::time::Duration;
use tracing::error;

use tracing_logzio_sink::init::{init_tracing_with_transport, InitConfig};
use tracing_logzio_sink::noop_transport::NoopTransport;
use tracing_logzio_sink::{FormattingOptions, LayerOptions, LogzioConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = LogzioConfig::new("load-test-token", "load-test");
    config.queue_limit = 50_000;
    config.batch_size_limit = 500;
    config.period = Duration::from_millis(200);
    config.formatting = FormattingOptions {
        boost_properties: true,
        include_message_template: true,
        ..FormattingOptions::default()
    };

    let init = InitConfig {
        layer: LayerOptions {
            min_level: tracing::Level::WARN,
            ..LayerOptions::default()
        },
        enable_stdout: false,
    };
    let guard = init_tracing_with_transport(config, NoopTransport, init)?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    guard.shutdown().await;
    println!(
        "enqueued {}, dropped {}, batches {}",
        guard.enqueued_events.load(Ordering::Relaxed),
        guard.dropped_events.load(Ordering::Relaxed),
        guard.delivered_batches.load(Ordering::Relaxed),
    );
    Ok(())
}

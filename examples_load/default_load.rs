use std::time::Instant;
use tracing::error;

use tracing_logzio_sink::init::{init_tracing_with_transport, InitConfig};
use tracing_logzio_sink::noop_transport::NoopTransport;
use tracing_logzio_sink::LogzioConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LogzioConfig::new("load-test-token", "load-test");
    let guard = init_tracing_with_transport(config, NoopTransport, InitConfig::default())?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    guard.shutdown().await;
    println!(
        "enqueued {}, dropped {}, batches {}",
        guard.enqueued_events.load(std::sync::atomic::Ordering::Relaxed),
        guard.dropped_events.load(std::sync::atomic::Ordering::Relaxed),
        guard.delivered_batches.load(std::sync::atomic::Ordering::Relaxed),
    );
    Ok(())
}

//! Simulated robot fleet publishing status messages to the broker.
//!
//! Configured through environment variables, see
//! [`ingest_runtime::publisher::PublisherConfig::from_env`].

use anyhow::Result;
use fleet_telemetry::{init_logging, TelemetryConfig};
use ingest_runtime::publisher::{self, PublisherConfig};
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig {
        service_name: "robot-mock-publisher".to_string(),
        ..TelemetryConfig::from_env()
    };
    init_logging(&telemetry)?;

    let config = PublisherConfig::from_env();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        shutdown_tx.send_replace(true);
    });

    let stats = publisher::run(config, shutdown_rx).await?;
    info!(
        published = stats.published,
        corrupted = stats.corrupted,
        dropped = stats.dropped,
        "Publisher stopped"
    );
    Ok(())
}

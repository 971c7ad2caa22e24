//! # Robot Telemetry Ingest
//!
//! Consumes robot status messages from the MQTT broker, persists the valid
//! ones and streams them to live observers over HTTP.
//!
//! ## Startup Sequence
//!
//! 1. Load telemetry configuration and initialize logging
//! 2. Load and validate runtime configuration
//! 3. Open the status store (PostgreSQL or in-memory)
//! 4. Start the bus consumer, liveness refresher and HTTP server
//! 5. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use fleet_telemetry::{init_logging, TelemetryConfig};
use ingest_runtime::{IngestRuntime, RuntimeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_logging(&telemetry)?;

    let config = RuntimeConfig::from_env();
    info!(
        mqtt_host = %config.mqtt.host,
        mqtt_port = config.mqtt.port,
        http_port = config.gateway.port,
        durable = config.database_url.is_some(),
        "Configuration loaded"
    );

    let runtime = IngestRuntime::start(config)
        .await
        .context("Failed to start ingest runtime")?;

    info!("Ingest runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}

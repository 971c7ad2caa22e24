//! # Fleet Telemetry
//!
//! Ambient observability for the robot telemetry ingest: structured logging,
//! Prometheus metrics and robot liveness tracking.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fleet_telemetry::{init_logging, TelemetryConfig, INGEST_METRICS};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//!
//! INGEST_METRICS.messages_received.inc();
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod liveness;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use liveness::{LivenessSnapshot, LivenessTracker};
pub use logging::init_logging;
pub use metrics::{IngestMetrics, INGEST_METRICS, LAG_BUCKETS};

use thiserror::Error;

/// Errors from telemetry setup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),
}

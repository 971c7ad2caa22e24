//! Telemetry configuration from environment variables.

use std::env;
use std::time::Duration;

/// Configuration for logging and robot liveness classification.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// A robot seen within this window counts as active
    pub active_window: Duration,

    /// How often active/stale gauges are recomputed
    pub active_refresh: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "robot-telemetry-ingest".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            active_window: Duration::from_secs(10),
            active_refresh: Duration::from_secs(5),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SERVICE_NAME`: Service name (default: robot-telemetry-ingest)
    /// - `LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `ACTIVE_WINDOW_SEC`: Liveness window in seconds (default: 10)
    /// - `ACTIVE_REFRESH_SEC`: Gauge refresh period in seconds (default: 5, min 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: env::var("LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),

            json_logs: env::var("JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            active_window: secs_from_env("ACTIVE_WINDOW_SEC").unwrap_or(defaults.active_window),

            active_refresh: secs_from_env("ACTIVE_REFRESH_SEC")
                .map(|d| d.max(Duration::from_secs(1)))
                .unwrap_or(defaults.active_refresh),
        }
    }
}

/// Parse a non-negative, possibly fractional, number of seconds.
fn secs_from_env(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

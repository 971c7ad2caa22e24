//! Prometheus metrics for the ingest pipeline.
//!
//! ## Metric Types
//!
//! - **Counter**: messages received, valid/invalid, storage writes, transitions
//! - **Gauge**: active/stale robots, live subscribers
//! - **Histogram**: lag between the event timestamp and its receipt

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::liveness::LivenessSnapshot;
use crate::TelemetryError;

/// Upper bounds of the lag histogram buckets, in seconds.
pub const LAG_BUCKETS: [f64; 7] = [0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0];

lazy_static! {
    /// Process-wide metrics, registered on their own registry.
    pub static ref INGEST_METRICS: Arc<IngestMetrics> =
        Arc::new(IngestMetrics::new().expect("metric creation failed"));
}

/// All collectors the pipeline writes to, bound to one registry.
pub struct IngestMetrics {
    registry: Registry,

    /// Every message taken off the bus
    pub messages_received: IntCounter,
    /// Messages that passed validation
    pub status_valid: IntCounter,
    /// Rejected messages by reason: topic/decode/schema/state_rule
    pub status_invalid: IntCounterVec,
    /// Successful storage writes
    pub db_insert: IntCounter,
    /// Failed storage writes
    pub db_insert_fail: IntCounter,
    /// Validated updates by driving status
    pub status_updates: IntCounterVec,
    /// Event timestamp to receive time, floored at zero
    pub message_lag: Histogram,
    /// Robots seen within the liveness window
    pub robots_active: IntGauge,
    /// Tracked robots outside the liveness window
    pub robots_stale: IntGauge,
    /// Currently registered live observers
    pub live_subscribers: IntGauge,
}

impl IngestMetrics {
    /// Create all collectors on a fresh registry.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let messages_received = IntCounter::new(
            "mqtt_messages_received_total",
            "Total MQTT messages received",
        )
        .map_err(metrics_err)?;

        let status_valid = IntCounter::new(
            "robot_status_valid_total",
            "Total valid robot status messages",
        )
        .map_err(metrics_err)?;

        let status_invalid = IntCounterVec::new(
            Opts::new(
                "robot_status_invalid_total",
                "Total invalid robot status messages",
            ),
            &["reason"],
        )
        .map_err(metrics_err)?;

        let db_insert =
            IntCounter::new("db_insert_total", "Total DB inserts").map_err(metrics_err)?;

        let db_insert_fail = IntCounter::new("db_insert_fail_total", "Total DB insert failures")
            .map_err(metrics_err)?;

        let status_updates = IntCounterVec::new(
            Opts::new(
                "robot_status_updates_total",
                "Robot status updates by driving status",
            ),
            &["driving_status"],
        )
        .map_err(metrics_err)?;

        let message_lag = Histogram::with_opts(
            HistogramOpts::new(
                "robot_message_lag_seconds",
                "Lag between payload timestamp and server receive time",
            )
            .buckets(LAG_BUCKETS.to_vec()),
        )
        .map_err(metrics_err)?;

        let robots_active = IntGauge::new("robots_active", "Robots seen within active window")
            .map_err(metrics_err)?;

        let robots_stale = IntGauge::new("robots_stale", "Robots not seen within active window")
            .map_err(metrics_err)?;

        let live_subscribers = IntGauge::new("live_subscribers", "Current live feed subscribers")
            .map_err(metrics_err)?;

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(messages_received.clone()),
            Box::new(status_valid.clone()),
            Box::new(status_invalid.clone()),
            Box::new(db_insert.clone()),
            Box::new(db_insert_fail.clone()),
            Box::new(status_updates.clone()),
            Box::new(message_lag.clone()),
            Box::new(robots_active.clone()),
            Box::new(robots_stale.clone()),
            Box::new(live_subscribers.clone()),
        ];
        for collector in collectors {
            registry.register(collector).map_err(metrics_err)?;
        }

        Ok(Self {
            registry,
            messages_received,
            status_valid,
            status_invalid,
            db_insert,
            db_insert_fail,
            status_updates,
            message_lag,
            robots_active,
            robots_stale,
            live_subscribers,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_invalid(&self, reason: &str) {
        self.status_invalid.with_label_values(&[reason]).inc();
    }

    pub fn invalid_count(&self, reason: &str) -> u64 {
        self.status_invalid.with_label_values(&[reason]).get()
    }

    pub fn record_status_update(&self, driving_status: &str) {
        self.status_updates.with_label_values(&[driving_status]).inc();
    }

    /// Observe `received_at - event_time`, clamped to zero for clock skew.
    pub fn observe_lag(&self, event_time: DateTime<Utc>, received_at: DateTime<Utc>) {
        let lag = (received_at - event_time).num_milliseconds() as f64 / 1000.0;
        self.message_lag.observe(lag.max(0.0));
    }

    pub fn set_liveness(&self, snapshot: LivenessSnapshot) {
        self.robots_active.set(snapshot.active as i64);
        self.robots_stale.set(snapshot.stale as i64);
    }

    pub fn set_live_subscribers(&self, count: usize) {
        self.live_subscribers.set(count as i64);
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(metrics_err)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

fn metrics_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

//! Ingestion Orchestrator
//!
//! The per-message pipeline:
//!
//! ```text
//! RawEvent ─→ validate ──err──→ invalid{reason} += 1, drop
//!                │ ok
//!                ├─→ valid += 1, updates{driving_status} += 1, lag, last_seen
//!                ↓
//!             persist ──err──→ db_insert_fail += 1, drop (no fanout)
//!                │ ok
//!                ↓
//!             db_insert += 1, broadcast(robot_id, json)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_telemetry::{IngestMetrics, LivenessTracker};
use rt_01_status_validation::StatusValidator;
use rt_02_bus_connection::RawEventHandler;
use shared_fanout::FanoutRegistry;
use shared_types::RawEvent;
use tracing::{debug, error, warn};

use crate::domain::IngestOutcome;
use crate::ports::PersistenceGateway;

/// Glues validation, persistence, fanout and metrics together.
pub struct IngestionOrchestrator<S: PersistenceGateway + ?Sized> {
    validator: StatusValidator,
    store: Arc<S>,
    fanout: FanoutRegistry,
    metrics: Arc<IngestMetrics>,
    liveness: Arc<LivenessTracker>,
    forward_raw_payload: bool,
}

impl<S: PersistenceGateway + ?Sized> IngestionOrchestrator<S> {
    pub fn new(
        validator: StatusValidator,
        store: Arc<S>,
        fanout: FanoutRegistry,
        metrics: Arc<IngestMetrics>,
        liveness: Arc<LivenessTracker>,
    ) -> Self {
        Self {
            validator,
            store,
            fanout,
            metrics,
            liveness,
            forward_raw_payload: true,
        }
    }

    /// Whether live observers receive the raw payload alongside the event.
    pub fn with_raw_payload_forwarding(mut self, forward: bool) -> Self {
        self.forward_raw_payload = forward;
        self
    }

    pub fn fanout(&self) -> &FanoutRegistry {
        &self.fanout
    }

    pub async fn process(&self, raw: RawEvent) -> IngestOutcome {
        self.process_at(raw, Utc::now()).await
    }

    /// Run the pipeline for one message received at `received_at`.
    ///
    /// Every failure is contained here and turned into a counter and a log
    /// line.
    pub async fn process_at(&self, raw: RawEvent, received_at: DateTime<Utc>) -> IngestOutcome {
        self.metrics.messages_received.inc();

        let event = match self
            .validator
            .validate_at(&raw.topic, &raw.payload, received_at)
        {
            Ok(event) => event,
            Err(e) => {
                let kind = e.kind();
                self.metrics.record_invalid(kind.as_str());
                warn!(topic = %raw.topic, reason = %kind, error = %e, "Status message rejected");
                return IngestOutcome::Rejected(kind);
            }
        };

        self.metrics.status_valid.inc();
        self.metrics
            .record_status_update(event.driving_status.as_str());
        self.metrics.observe_lag(event.timestamp, received_at);
        self.liveness.record(&event.robot_id, received_at);
        self.metrics
            .set_liveness(self.liveness.recompute(received_at));

        if let Err(e) = self.store.insert(&event).await {
            self.metrics.db_insert_fail.inc();
            error!(robot_id = %event.robot_id, error = %e, "Status insert failed, event not broadcast");
            return IngestOutcome::StorageFailed;
        }
        self.metrics.db_insert.inc();

        let subscribers = match event.to_json(self.forward_raw_payload) {
            Ok(json) => self.fanout.broadcast(&event.robot_id, json),
            Err(e) => {
                error!(robot_id = %event.robot_id, error = %e, "Failed to serialize status event");
                0
            }
        };

        debug!(
            robot_id = %event.robot_id,
            driving_status = event.driving_status.as_str(),
            subscribers,
            "Status event ingested"
        );
        IngestOutcome::Delivered { subscribers }
    }
}

#[async_trait]
impl<S: PersistenceGateway + ?Sized> RawEventHandler for IngestionOrchestrator<S> {
    async fn on_raw_event(&self, event: RawEvent) {
        self.process(event).await;
    }
}

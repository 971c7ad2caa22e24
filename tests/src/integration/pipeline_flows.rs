//! # Pipeline Flows
//!
//! Bus message → validation → persistence → fanout, driven through the
//! connection manager exactly as the runtime wires it.
//!
//! ## Flows Tested
//!
//! 1. Valid status reaches storage and every registered observer
//! 2. State-rule and topic violations are counted and go nowhere
//! 3. Unregistered observers receive nothing
//! 4. A storage outage suppresses the broadcast but not the receive loop

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{TimeZone, Utc};
    use fleet_telemetry::{IngestMetrics, LivenessTracker};
    use rt_01_status_validation::{FailureKind, StatusValidator};
    use rt_02_bus_connection::ConnectionManager;
    use rt_03_ingestion::{HistoryQuery, HistoryReader, InMemoryStatusStore, IngestionOrchestrator};
    use serde_json::{json, Value};
    use shared_fanout::FanoutRegistry;
    use shared_types::{DrivingStatus, RobotId};
    use tokio::sync::watch;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use crate::support::{
        bytes, eventually, idle_status, moving_status, status_topic, wait_connected, FakeBroker,
        DRIVE_A, DRIVE_B, WAIT,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    struct Pipeline {
        broker: FakeBroker,
        store: Arc<InMemoryStatusStore>,
        fanout: FanoutRegistry,
        metrics: Arc<IngestMetrics>,
        shutdown_tx: watch::Sender<bool>,
        task: JoinHandle<()>,
    }

    impl Pipeline {
        async fn start() -> Self {
            let broker = FakeBroker::new();
            let store = Arc::new(InMemoryStatusStore::new());
            let fanout = FanoutRegistry::new();
            let metrics = Arc::new(IngestMetrics::new().unwrap());
            let orchestrator = IngestionOrchestrator::new(
                StatusValidator::default(),
                Arc::clone(&store),
                fanout.clone(),
                Arc::clone(&metrics),
                Arc::new(LivenessTracker::new(StdDuration::from_secs(10))),
            );

            let manager = ConnectionManager::new(broker.clone(), "robot/+/status");
            let mut state = manager.state();
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let task = tokio::spawn(async move {
                manager.run(&orchestrator, shutdown_rx).await;
            });
            wait_connected(&mut state).await;

            Self {
                broker,
                store,
                fanout,
                metrics,
                shutdown_tx,
                task,
            }
        }

        async fn stop(self) {
            self.shutdown_tx.send_replace(true);
            timeout(WAIT, self.task).await.unwrap().unwrap();
        }
    }

    // =========================================================================
    // FLOWS
    // =========================================================================

    /// Canonical idle message: stored once, delivered to both observers.
    #[tokio::test]
    async fn test_valid_status_is_stored_and_fanned_out() {
        let p = Pipeline::start().await;
        let mut first = p.fanout.register(RobotId::new("R1"));
        let mut second = p.fanout.register(RobotId::new("R1"));

        assert!(p.broker.publish(&status_topic("R1"), bytes(&idle_status())));

        let frame = timeout(WAIT, first.recv()).await.unwrap().unwrap();
        let delivered: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(delivered["robot_id"], json!("R1"));
        assert_eq!(delivered["battery_level"], json!(50));
        assert_eq!(delivered["driving_status"], json!("IDLE"));
        assert_eq!(delivered["current_drive_id"], Value::Null);
        assert_eq!(delivered["timestamp"], json!("2025-01-01T00:00:00Z"));

        let copy = timeout(WAIT, second.recv()).await.unwrap().unwrap();
        assert_eq!(copy, frame);

        let rows = p.store.rows_for(&RobotId::new("R1"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].driving_status, DrivingStatus::Idle);
        assert_eq!(p.broker.filters(), ["robot/+/status"]);
        p.stop().await;
    }

    /// Moving without a drive id, a drive id that is not a UUID and a wrong
    /// topic suffix are all rejected without touching storage or observers.
    #[tokio::test]
    async fn test_rejections_leave_no_trace() {
        let p = Pipeline::start().await;
        let mut sub = p.fanout.register(RobotId::new("R1"));

        let mut broken = idle_status();
        broken["driving_status"] = json!("MOVING");
        p.broker.publish(&status_topic("R1"), bytes(&broken));
        p.broker.publish("robot/R1/telemetry", bytes(&idle_status()));
        p.broker.publish(&status_topic("R1"), "not json");
        p.broker.publish(&status_topic("R1"), bytes(&moving_status("drive-7")));

        eventually(|| p.metrics.messages_received.get() == 4).await;
        assert_eq!(p.metrics.invalid_count(FailureKind::Schema.as_str()), 1);
        assert_eq!(p.metrics.invalid_count(FailureKind::StateRule.as_str()), 1);
        assert_eq!(p.metrics.invalid_count(FailureKind::Topic.as_str()), 1);
        assert_eq!(p.metrics.invalid_count(FailureKind::Decode.as_str()), 1);
        assert!(p.store.is_empty());
        assert!(sub.try_recv().unwrap().is_none());
        assert_eq!(p.broker.connects(), 1);

        p.broker.publish(&status_topic("R1"), bytes(&moving_status(DRIVE_A)));
        let frame = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
        let delivered: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(delivered["current_drive_id"], json!(DRIVE_A));
        p.stop().await;
    }

    /// Two observers register, one leaves; only the other is reached.
    #[tokio::test]
    async fn test_unregistered_observer_is_skipped() {
        let p = Pipeline::start().await;
        let mut staying = p.fanout.register(RobotId::new("R1"));
        let leaving = p.fanout.register(RobotId::new("R1"));
        let other_robot = p.fanout.register(RobotId::new("R2"));
        drop(leaving);
        assert_eq!(p.fanout.subscribers_for(&RobotId::new("R1")), 1);

        p.broker.publish(&status_topic("R1"), bytes(&idle_status()));

        timeout(WAIT, staying.recv()).await.unwrap().unwrap();
        eventually(|| p.fanout.stats().delivered == 1).await;
        assert_eq!(p.fanout.stats().dropped, 0);
        drop(other_robot);
        p.stop().await;
    }

    /// A failed insert drops the event for observers, is counted, and the
    /// next message goes through once storage recovers.
    #[tokio::test]
    async fn test_storage_outage_suppresses_broadcast() {
        let p = Pipeline::start().await;
        let mut sub = p.fanout.register(RobotId::new("R1"));

        p.store.set_unavailable(true);
        p.broker.publish(&status_topic("R1"), bytes(&idle_status()));
        eventually(|| p.metrics.db_insert_fail.get() == 1).await;
        assert_eq!(p.metrics.status_valid.get(), 1);
        assert!(sub.try_recv().unwrap().is_none());

        p.store.set_unavailable(false);
        p.broker.publish(&status_topic("R1"), bytes(&moving_status(DRIVE_B)));
        timeout(WAIT, sub.recv()).await.unwrap().unwrap();
        assert_eq!(p.metrics.db_insert.get(), 1);
        assert_eq!(p.broker.connects(), 1);
        p.stop().await;
    }

    /// Stored events come back from a history query in timestamp order.
    #[tokio::test]
    async fn test_ingested_events_are_queryable() {
        let p = Pipeline::start().await;
        for second in [30, 10, 20] {
            let mut status = idle_status();
            status["timestamp"] = json!(format!("2025-01-01T00:00:{second}Z"));
            p.broker.publish(&status_topic("R1"), bytes(&status));
        }
        eventually(|| p.store.len() == 3).await;

        let query = HistoryQuery::new(
            RobotId::new("R1"),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 25).unwrap(),
        )
        .unwrap();
        let rows = p.store.history(&query).await.unwrap();
        let seconds: Vec<i64> = rows.iter().map(|e| e.timestamp.timestamp() % 60).collect();
        assert_eq!(seconds, [10, 20]);
        p.stop().await;
    }
}

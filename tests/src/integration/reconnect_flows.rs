//! # Reconnect Flows
//!
//! Connection loss between the broker and the ingest pipeline.
//!
//! ## Flows Tested
//!
//! 1. Refused connects back off 1s, 2s, 4s before the first session
//! 2. A dropped session reconnects after the floor delay, since the backoff
//!    resets on success, and ingestion resumes
//! 3. Shutdown during backoff stops promptly and leaves the state
//!    `Disconnected`

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fleet_telemetry::{IngestMetrics, LivenessTracker};
    use parking_lot::Mutex;
    use rt_01_status_validation::StatusValidator;
    use rt_02_bus_connection::{ConnectionManager, ConnectionState};
    use rt_03_ingestion::{InMemoryStatusStore, IngestionOrchestrator};
    use shared_fanout::FanoutRegistry;
    use shared_types::RobotId;
    use tokio::sync::watch;
    use tokio::time::timeout;

    use crate::support::{
        bytes, eventually, idle_status, status_topic, wait_connected, FakeBroker, WAIT,
    };

    type Orchestrator = IngestionOrchestrator<InMemoryStatusStore>;

    fn orchestrator(fanout: &FanoutRegistry) -> Orchestrator {
        IngestionOrchestrator::new(
            StatusValidator::default(),
            Arc::new(InMemoryStatusStore::new()),
            fanout.clone(),
            Arc::new(IngestMetrics::new().unwrap()),
            Arc::new(LivenessTracker::new(Duration::from_secs(10))),
        )
    }

    /// Record every backoff delay the manager announces.
    fn record_backoffs(mut state: watch::Receiver<ConnectionState>) -> Arc<Mutex<Vec<Duration>>> {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delays);
        tokio::spawn(async move {
            while state.changed().await.is_ok() {
                if let ConnectionState::Backoff(delay) = *state.borrow_and_update() {
                    sink.lock().push(delay);
                }
            }
        });
        delays
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connects_back_off_then_ingest() {
        let broker = FakeBroker::new();
        broker.refuse_next(3);
        let fanout = FanoutRegistry::new();
        let orchestrator = orchestrator(&fanout);
        let manager = ConnectionManager::new(broker.clone(), "robot/+/status");
        let mut state = manager.state();
        let delays = record_backoffs(manager.state());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move { manager.run(&orchestrator, shutdown_rx).await });
        wait_connected(&mut state).await;

        assert_eq!(broker.connects(), 4);
        assert_eq!(
            *delays.lock(),
            [
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );

        let mut sub = fanout.register(RobotId::new("R1"));
        broker.publish(&status_topic("R1"), bytes(&idle_status()));
        timeout(WAIT, sub.recv()).await.unwrap().unwrap();

        shutdown_tx.send_replace(true);
        timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_session_reconnects_and_resumes() {
        let broker = FakeBroker::new();
        let fanout = FanoutRegistry::new();
        let orchestrator = orchestrator(&fanout);
        let manager = ConnectionManager::new(broker.clone(), "robot/+/status");
        let mut state = manager.state();
        let delays = record_backoffs(manager.state());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move { manager.run(&orchestrator, shutdown_rx).await });
        wait_connected(&mut state).await;
        let mut sub = fanout.register(RobotId::new("R1"));

        broker.publish(&status_topic("R1"), bytes(&idle_status()));
        timeout(WAIT, sub.recv()).await.unwrap().unwrap();

        broker.drop_connection();
        assert!(!broker.publish(&status_topic("R1"), bytes(&idle_status())));

        eventually(|| broker.connects() == 2).await;
        wait_connected(&mut state).await;
        assert_eq!(broker.closes(), 1);
        assert_eq!(*delays.lock(), [Duration::from_secs(1)]);
        assert_eq!(broker.filters().len(), 2);

        broker.publish(&status_topic("R1"), bytes(&idle_status()));
        timeout(WAIT, sub.recv()).await.unwrap().unwrap();
        assert!(sub.try_recv().unwrap().is_none());

        shutdown_tx.send_replace(true);
        timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(broker.closes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff() {
        let broker = FakeBroker::new();
        broker.refuse_next(usize::MAX);
        let fanout = FanoutRegistry::new();
        let orchestrator = orchestrator(&fanout);
        let manager = ConnectionManager::new(broker.clone(), "robot/+/status");
        let mut state = manager.state();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move { manager.run(&orchestrator, shutdown_rx).await });
        timeout(
            WAIT,
            state.wait_for(|s| matches!(s, ConnectionState::Backoff(_))),
        )
        .await
        .unwrap()
        .unwrap();

        shutdown_tx.send_replace(true);
        timeout(Duration::from_millis(100), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        assert_eq!(broker.connects(), 1);
    }
}

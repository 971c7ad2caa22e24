//! # Test Support
//!
//! An in-process broker implementing the bus transport port, plus payload
//! fixtures shared by the integration flows.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rt_02_bus_connection::{BusSession, BusTransport, ConnectionState, TransportError};
use serde_json::{json, Value};
use shared_types::RawEvent;
use tokio::sync::{mpsc, watch};

/// Upper bound for any single wait in the flows.
pub const WAIT: Duration = Duration::from_secs(5);

/// Drive ids for moving fixtures.
pub const DRIVE_A: &str = "7a3f0c2e-5d1b-4e8a-b6c9-2f4e6a8b0c1d";
pub const DRIVE_B: &str = "c4e2a9b1-0f3d-4a6c-8e7b-9d1f3a5c7e2b";

type Delivery = Result<RawEvent, TransportError>;

#[derive(Default)]
struct BrokerState {
    refuse_next: usize,
    connects: usize,
    closes: usize,
    filters: Vec<String>,
    session: Option<mpsc::UnboundedSender<Delivery>>,
}

/// Fake broker. Clones share state, so a test keeps one handle and gives
/// another to the connection manager.
#[derive(Clone, Default)]
pub struct FakeBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_next(&self, n: usize) {
        self.state.lock().refuse_next = n;
    }

    /// Deliver to the connected client. Returns `false` when nobody is
    /// connected, in which case the message is lost.
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> bool {
        let state = self.state.lock();
        match &state.session {
            Some(tx) => tx.send(Ok(RawEvent::new(topic, payload))).is_ok(),
            None => false,
        }
    }

    /// Break the current connection with a receive error.
    pub fn drop_connection(&self) {
        if let Some(tx) = self.state.lock().session.take() {
            let _ = tx.send(Err(TransportError::Receive("connection reset".into())));
        }
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    pub fn filters(&self) -> Vec<String> {
        self.state.lock().filters.clone()
    }
}

pub struct FakeSession {
    rx: mpsc::UnboundedReceiver<Delivery>,
    state: Arc<Mutex<BrokerState>>,
}

#[async_trait]
impl BusTransport for FakeBroker {
    type Session = FakeSession;

    async fn connect(&self) -> Result<FakeSession, TransportError> {
        let mut state = self.state.lock();
        state.connects += 1;
        if state.refuse_next > 0 {
            state.refuse_next -= 1;
            return Err(TransportError::Connect("connection refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.session = Some(tx);
        Ok(FakeSession {
            rx,
            state: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl BusSession for FakeSession {
    async fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        self.state.lock().filters.push(filter.to_string());
        Ok(())
    }

    async fn next_message(&mut self) -> Result<RawEvent, TransportError> {
        self.rx.recv().await.unwrap_or(Err(TransportError::Closed))
    }

    async fn close(&mut self) {
        self.state.lock().closes += 1;
    }
}

/// Wait until the manager reports a live subscription.
pub async fn wait_connected(state: &mut watch::Receiver<ConnectionState>) {
    tokio::time::timeout(WAIT, state.wait_for(|s| s.is_connected()))
        .await
        .expect("not connected in time")
        .expect("connection manager gone");
}

/// Poll `condition` until it holds or [`WAIT`] elapses.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// A valid idle status, as in the canonical example message.
pub fn idle_status() -> Value {
    json!({
        "timestamp": "2025-01-01T00:00:00Z",
        "battery_level": 50,
        "battery_status": "CHARGING",
        "driving_status": "IDLE",
        "current_drive_id": null,
        "location": {"latitude": 1, "longitude": 2, "height": 0}
    })
}

/// A valid moving status with a drive id.
pub fn moving_status(drive_id: &str) -> Value {
    let mut status = idle_status();
    status["driving_status"] = json!("MOVING");
    status["battery_status"] = json!("DISCHARGING");
    status["current_drive_id"] = json!(drive_id);
    status
}

pub fn bytes(value: &Value) -> Vec<u8> {
    value.to_string().into_bytes()
}

pub fn status_topic(robot_id: &str) -> String {
    format!("robot/{robot_id}/status")
}

//! In-memory status store.
//!
//! Used when no database is configured, and by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Map;
use shared_types::{RobotId, StatusEvent, StorageError};

use crate::domain::HistoryQuery;
use crate::ports::{HistoryReader, PersistenceGateway};

/// Keeps every inserted event per robot in insertion order.
#[derive(Default)]
pub struct InMemoryStatusStore {
    rows: RwLock<HashMap<RobotId, Vec<StatusEvent>>>,
    unavailable: AtomicBool,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows_for(&self, robot_id: &RobotId) -> Vec<StatusEvent> {
        self.rows.read().get(robot_id).cloned().unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryStatusStore {
    async fn insert(&self, event: &StatusEvent) -> Result<(), StorageError> {
        self.check_available()?;
        self.rows
            .write()
            .entry(event.robot_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_available()
    }
}

#[async_trait]
impl HistoryReader for InMemoryStatusStore {
    async fn history(&self, query: &HistoryQuery) -> Result<Vec<StatusEvent>, StorageError> {
        self.check_available()?;
        let rows = self.rows.read();
        let Some(events) = rows.get(&query.robot_id) else {
            return Ok(Vec::new());
        };

        let mut matching: Vec<StatusEvent> = events
            .iter()
            .filter(|e| query.contains(e.timestamp))
            .cloned()
            .collect();
        // Stable, so equal timestamps keep insertion order.
        matching.sort_by_key(|e| e.timestamp);
        matching.truncate(query.limit);

        if !query.include_payload {
            for event in &mut matching {
                event.raw_payload = Map::new();
            }
        }
        Ok(matching)
    }
}

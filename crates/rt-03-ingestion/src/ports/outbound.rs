//! Outbound Ports (Driven Ports)
//!
//! Durable storage for validated status events.

use async_trait::async_trait;
use shared_types::{StatusEvent, StorageError};

use crate::domain::HistoryQuery;

/// Durable write path.
///
/// `insert` is transactional per call: on error no row exists. Fanout only
/// happens after it returns `Ok`.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Store the event together with its raw payload.
    async fn insert(&self, event: &StatusEvent) -> Result<(), StorageError>;

    /// Cheap liveness check of the backend.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Read path for historical range queries.
#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// Matching events, oldest first, at most `query.limit`.
    ///
    /// `raw_payload` is left empty unless `query.include_payload` is set.
    async fn history(&self, query: &HistoryQuery) -> Result<Vec<StatusEvent>, StorageError>;
}

/// A backend that serves both paths.
pub trait StatusStore: PersistenceGateway + HistoryReader {}

impl<T: PersistenceGateway + HistoryReader> StatusStore for T {}

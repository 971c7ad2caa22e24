//! # RT-03 Ingestion
//!
//! The per-message pipeline from raw bus bytes to durable storage and live
//! observers.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `HistoryQuery`, `IngestOutcome`
//! - **Ports Layer** (`ports/`)
//!   - `PersistenceGateway`: durable write path
//!   - `HistoryReader`: range queries for the HTTP surface
//! - **Service Layer** (`service/`): `IngestionOrchestrator`, which implements
//!   the bus connection's `RawEventHandler`
//! - **Adapters Layer** (`adapters/`)
//!   - `InMemoryStatusStore`
//!   - `PostgresStatusStore` (feature `postgres`)
//!
//! ## Delivery Contract
//!
//! At least once to storage, best effort to subscribers: an event is only
//! broadcast after its insert succeeded, and a failed insert drops it for
//! fanout purposes.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryStatusStore;
#[cfg(feature = "postgres")]
pub use adapters::PostgresStatusStore;
pub use domain::{
    HistoryQuery, IngestOutcome, QueryError, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT,
};
pub use ports::{HistoryReader, PersistenceGateway, StatusStore};
pub use service::IngestionOrchestrator;

//! Ports for the ingestion subsystem.

pub mod outbound;

pub use outbound::{HistoryReader, PersistenceGateway, StatusStore};

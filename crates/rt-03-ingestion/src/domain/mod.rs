//! Ingestion domain types.

pub mod history;
pub mod outcome;

pub use history::{HistoryQuery, QueryError, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use outcome::IngestOutcome;

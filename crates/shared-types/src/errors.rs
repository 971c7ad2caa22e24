//! # Error Types
//!
//! Error types shared between the ingestion pipeline and its storage adapters.

use thiserror::Error;

/// Errors from the persistence gateway.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Storage backend cannot be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write or read statement failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored row could not be mapped back into a status event.
    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

/// A string that does not name any variant of a wire enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {field} value: {value:?}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

//! Error types for the bus connection

use thiserror::Error;

/// Bus failures. All of them are recoverable and lead to a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection closed by broker")]
    Closed,
}

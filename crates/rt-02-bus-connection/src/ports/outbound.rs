//! Outbound Ports (Driven Ports)
//!
//! The broker client the connection manager drives.

use async_trait::async_trait;
use shared_types::RawEvent;

use crate::error::TransportError;

/// Opens sessions against the broker.
#[async_trait]
pub trait BusTransport: Send + Sync {
    type Session: BusSession;

    /// Establish a connection. Returns once the broker has accepted it.
    async fn connect(&self) -> Result<Self::Session, TransportError>;
}

/// One live broker connection.
#[async_trait]
pub trait BusSession: Send {
    async fn subscribe(&mut self, filter: &str) -> Result<(), TransportError>;

    /// Wait for the next inbound publish.
    async fn next_message(&mut self) -> Result<RawEvent, TransportError>;

    /// Tear the connection down. Must be safe to call on a broken session.
    async fn close(&mut self);
}

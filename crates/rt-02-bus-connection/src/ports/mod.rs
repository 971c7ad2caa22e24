//! Ports for the bus connection.

pub mod inbound;
pub mod outbound;

pub use inbound::RawEventHandler;
pub use outbound::{BusSession, BusTransport};

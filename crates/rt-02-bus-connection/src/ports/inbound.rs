//! Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_types::RawEvent;

/// Receives every message taken off the bus, in arrival order.
///
/// Implementations must contain their own failures: nothing a handler does
/// can affect the connection.
#[async_trait]
pub trait RawEventHandler: Send + Sync {
    async fn on_raw_event(&self, event: RawEvent);
}

//! Connection state machine.
//!
//! ```text
//! Disconnected → Connecting → Connected
//!                    ↑            │ transport error
//!                    │            ↓
//!                    └──── Backoff(delay)
//! ```

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting `delay` before the next attempt.
    Backoff(Duration),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Backoff(delay) => write!(f, "backoff({}s)", delay.as_secs_f64()),
        }
    }
}

//! Pure connection logic: the reconnect delay and the state enum.

pub mod backoff;
pub mod state;

pub use backoff::{Backoff, BackoffPolicy};
pub use state::ConnectionState;

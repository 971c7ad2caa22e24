//! Result of processing one raw message.

use rt_01_status_validation::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Validation failed; nothing was stored or broadcast.
    Rejected(FailureKind),
    /// Valid, but the durable write failed; nothing was broadcast.
    StorageFailed,
    /// Stored and handed to `subscribers` live observers.
    Delivered { subscribers: usize },
}

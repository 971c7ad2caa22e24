//! Pure validation steps. No I/O and no clock reads.

pub mod payload;
pub mod topic;

pub use payload::{build_event, check_drive_rule, decode, BATTERY_LEVEL_MAX, BATTERY_LEVEL_MIN};
pub use topic::TopicFormat;

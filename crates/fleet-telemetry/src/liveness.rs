//! Robot liveness classification.
//!
//! A robot is active if its last accepted message arrived within the window,
//! stale otherwise. Only robots that have sent at least one valid message are
//! tracked.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared_types::RobotId;

/// Counts produced by one recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessSnapshot {
    pub tracked: usize,
    pub active: usize,
    pub stale: usize,
}

/// Last-seen times per robot.
pub struct LivenessTracker {
    window: chrono::Duration,
    last_seen: Mutex<HashMap<RobotId, DateTime<Utc>>>,
}

impl LivenessTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window: chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `robot_id` was seen at `at`. Later calls overwrite earlier ones.
    pub fn record(&self, robot_id: &RobotId, at: DateTime<Utc>) {
        self.last_seen.lock().insert(robot_id.clone(), at);
    }

    pub fn last_seen(&self, robot_id: &RobotId) -> Option<DateTime<Utc>> {
        self.last_seen.lock().get(robot_id).copied()
    }

    /// Classify every tracked robot relative to `now`.
    ///
    /// A last-seen time in the future counts as active.
    pub fn recompute(&self, now: DateTime<Utc>) -> LivenessSnapshot {
        let last_seen = self.last_seen.lock();
        let active = last_seen
            .values()
            .filter(|seen| now.signed_duration_since(**seen) <= self.window)
            .count();

        LivenessSnapshot {
            tracked: last_seen.len(),
            active,
            stale: last_seen.len() - active,
        }
    }
}

//! History range queries.

use chrono::{DateTime, Utc};
use shared_types::RobotId;
use thiserror::Error;

/// Rows returned when the caller does not ask for a limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;
/// Largest accepted limit.
pub const MAX_HISTORY_LIMIT: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("end_time must be >= start_time")]
    InvalidRange,

    #[error("limit must be between 1 and 5000, got {0}")]
    InvalidLimit(usize),
}

/// Events of one robot with `start <= timestamp <= end`, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub robot_id: RobotId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub include_payload: bool,
    pub limit: usize,
}

impl HistoryQuery {
    pub fn new(
        robot_id: RobotId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, QueryError> {
        if end < start {
            return Err(QueryError::InvalidRange);
        }
        Ok(Self {
            robot_id,
            start,
            end,
            include_payload: false,
            limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Result<Self, QueryError> {
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(QueryError::InvalidLimit(limit));
        }
        self.limit = limit;
        Ok(self)
    }

    pub fn with_payload(mut self, include_payload: bool) -> Self {
        self.include_payload = include_payload;
        self
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

//! The validator entry point.

use chrono::{DateTime, Utc};
use shared_types::{RawEvent, StatusEvent};

use crate::domain::{build_event, decode, TopicFormat};
use crate::error::ValidationError;

/// Turns raw bus messages into [`StatusEvent`]s, all or nothing.
#[derive(Debug, Clone, Default)]
pub struct StatusValidator {
    topics: TopicFormat,
}

impl StatusValidator {
    pub fn new(topics: TopicFormat) -> Self {
        Self { topics }
    }

    pub fn topics(&self) -> &TopicFormat {
        &self.topics
    }

    /// Validate against the current wall clock.
    pub fn validate(&self, topic: &str, payload: &[u8]) -> Result<StatusEvent, ValidationError> {
        self.validate_at(topic, payload, Utc::now())
    }

    /// Validate, using `now` when the payload has no timestamp.
    ///
    /// Checks run in order: topic, decode, schema, drive-id rule. The first
    /// failure wins.
    pub fn validate_at(
        &self,
        topic: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<StatusEvent, ValidationError> {
        let robot_id = self.topics.parse(topic)?;
        let raw_payload = decode(payload)?;
        build_event(robot_id, raw_payload, now)
    }

    pub fn validate_raw(&self, raw: &RawEvent) -> Result<StatusEvent, ValidationError> {
        self.validate(&raw.topic, &raw.payload)
    }
}

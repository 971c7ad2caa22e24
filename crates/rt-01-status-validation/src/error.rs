//! Error types for status validation

use std::fmt;

use thiserror::Error;

/// Why a message was rejected. Each check has exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Topic,
    Decode,
    Schema,
    StateRule,
}

impl FailureKind {
    /// Label used for the `reason` metric tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Topic => "topic",
            FailureKind::Decode => "decode",
            FailureKind::Schema => "schema",
            FailureKind::StateRule => "state_rule",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected status message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed topic: {topic:?}")]
    Topic { topic: String },

    #[error("Payload decode failed: {0}")]
    Decode(String),

    #[error("Schema violation: {0}")]
    Schema(String),

    #[error("Drive id rule violated: {0}")]
    StateRule(String),
}

impl ValidationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ValidationError::Topic { .. } => FailureKind::Topic,
            ValidationError::Decode(_) => FailureKind::Decode,
            ValidationError::Schema(_) => FailureKind::Schema,
            ValidationError::StateRule(_) => FailureKind::StateRule,
        }
    }
}

//! Topic shape `<namespace>/<robot_id>/<suffix>`.

use shared_types::RobotId;

use crate::error::ValidationError;

/// The topic layout robots publish their status on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFormat {
    pub namespace: String,
    pub suffix: String,
}

impl Default for TopicFormat {
    fn default() -> Self {
        Self {
            namespace: "robot".to_string(),
            suffix: "status".to_string(),
        }
    }
}

impl TopicFormat {
    pub fn new(namespace: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            suffix: suffix.into(),
        }
    }

    /// Single-level wildcard filter matching every robot, e.g. `robot/+/status`.
    pub fn subscription_filter(&self) -> String {
        format!("{}/+/{}", self.namespace, self.suffix)
    }

    /// Topic a given robot publishes on.
    pub fn topic_for(&self, robot_id: &RobotId) -> String {
        format!("{}/{}/{}", self.namespace, robot_id, self.suffix)
    }

    /// Extract the robot id. Anything but exactly three segments with the
    /// expected namespace and suffix and a non-empty middle is rejected.
    pub fn parse(&self, topic: &str) -> Result<RobotId, ValidationError> {
        let mut parts = topic.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(ns), Some(id), Some(suffix), None)
                if ns == self.namespace && suffix == self.suffix && !id.is_empty() =>
            {
                Ok(RobotId::new(id))
            }
            _ => Err(ValidationError::Topic {
                topic: topic.to_string(),
            }),
        }
    }
}

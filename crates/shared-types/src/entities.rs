//! # Core Domain Entities
//!
//! Status events as they travel from the bus to storage and live observers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::UnknownVariant;

/// Opaque robot identifier, taken from the bus topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotId(String);

impl RobotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RobotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RobotId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Battery charge direction reported by the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatteryStatus {
    Charging,
    Discharging,
}

impl BatteryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryStatus::Charging => "CHARGING",
            BatteryStatus::Discharging => "DISCHARGING",
        }
    }
}

impl FromStr for BatteryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHARGING" => Ok(BatteryStatus::Charging),
            "DISCHARGING" => Ok(BatteryStatus::Discharging),
            other => Err(UnknownVariant {
                field: "battery_status",
                value: other.to_string(),
            }),
        }
    }
}

/// Motion state reported by the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrivingStatus {
    Idle,
    Moving,
}

impl DrivingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrivingStatus::Idle => "IDLE",
            DrivingStatus::Moving => "MOVING",
        }
    }
}

impl FromStr for DrivingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(DrivingStatus::Idle),
            "MOVING" => Ok(DrivingStatus::Moving),
            other => Err(UnknownVariant {
                field: "driving_status",
                value: other.to_string(),
            }),
        }
    }
}

/// Robot position. The sensor is trusted, so no range checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

/// A message exactly as it came off the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl RawEvent {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// A validated robot status event.
///
/// Only the validator constructs these, and nothing mutates them afterwards.
/// `active_drive_id` is `Some` exactly when `driving_status` is `Moving`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub robot_id: RobotId,
    pub timestamp: DateTime<Utc>,
    pub battery_level: u8,
    pub battery_status: BatteryStatus,
    pub driving_status: DrivingStatus,
    pub active_drive_id: Option<String>,
    pub location: Location,
    /// The decoded payload, unknown fields included.
    pub raw_payload: Map<String, Value>,
}

impl StatusEvent {
    /// Borrowed wire view of this event.
    ///
    /// The raw payload is only attached when `include_payload` is set.
    pub fn to_record(&self, include_payload: bool) -> StatusRecord<'_> {
        StatusRecord {
            robot_id: &self.robot_id,
            timestamp: self.timestamp,
            battery_level: self.battery_level,
            battery_status: self.battery_status,
            driving_status: self.driving_status,
            current_drive_id: self.active_drive_id.as_deref(),
            location: self.location,
            payload: include_payload.then_some(&self.raw_payload),
        }
    }

    /// Serialize to the canonical JSON document sent to observers.
    pub fn to_json(&self, include_payload: bool) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_record(include_payload))
    }
}

/// Canonical serialized shape of a [`StatusEvent`].
#[derive(Debug, Serialize)]
pub struct StatusRecord<'a> {
    pub robot_id: &'a RobotId,
    pub timestamp: DateTime<Utc>,
    pub battery_level: u8,
    pub battery_status: BatteryStatus,
    pub driving_status: DrivingStatus,
    pub current_drive_id: Option<&'a str>,
    pub location: Location,
    pub payload: Option<&'a Map<String, Value>>,
}

//! Payload decoding, schema coercion and the drive-id pairing rule.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use shared_types::{BatteryStatus, DrivingStatus, Location, RobotId, StatusEvent};
use uuid::Uuid;

use crate::error::ValidationError;

/// Accepted range for `battery_level`, both ends inclusive.
pub const BATTERY_LEVEL_MIN: i64 = 1;
pub const BATTERY_LEVEL_MAX: i64 = 100;

/// Naive layouts accepted when the timestamp carries no offset.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Typed view of the known fields. Unknown fields are ignored here and kept
/// in the raw map.
#[derive(Debug, Deserialize)]
struct WireStatus {
    #[serde(default)]
    timestamp: Option<Value>,
    battery_level: Number,
    battery_status: BatteryStatus,
    driving_status: DrivingStatus,
    #[serde(default)]
    current_drive_id: Option<String>,
    location: Location,
}

/// Parse the body into a JSON object.
pub fn decode(bytes: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ValidationError::Decode(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(ValidationError::Decode(e.to_string())),
    }
}

/// Coerce a decoded object into a [`StatusEvent`].
///
/// `now` is used when the payload has no timestamp.
pub fn build_event(
    robot_id: RobotId,
    raw_payload: Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<StatusEvent, ValidationError> {
    let object = Value::Object(raw_payload);
    let wire =
        WireStatus::deserialize(&object).map_err(|e| ValidationError::Schema(e.to_string()))?;
    let raw_payload = match object {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let battery_level = whole_number(&wire.battery_level).ok_or_else(|| {
        ValidationError::Schema(format!(
            "battery_level {} is not a whole number",
            wire.battery_level
        ))
    })?;
    if !(BATTERY_LEVEL_MIN..=BATTERY_LEVEL_MAX).contains(&battery_level) {
        return Err(ValidationError::Schema(format!(
            "battery_level {battery_level} outside {BATTERY_LEVEL_MIN}..={BATTERY_LEVEL_MAX}"
        )));
    }

    let drive_id = wire
        .current_drive_id
        .as_deref()
        .map(parse_drive_id)
        .transpose()?;

    let timestamp = match &wire.timestamp {
        None => now,
        Some(value) => parse_timestamp(value)?,
    };

    check_drive_rule(wire.driving_status, drive_id.as_deref())?;

    Ok(StatusEvent {
        robot_id,
        timestamp,
        battery_level: battery_level as u8,
        battery_status: wire.battery_status,
        driving_status: wire.driving_status,
        active_drive_id: drive_id,
        location: wire.location,
        raw_payload,
    })
}

/// A drive id must be present while moving and absent while idle.
pub fn check_drive_rule(
    driving_status: DrivingStatus,
    drive_id: Option<&str>,
) -> Result<(), ValidationError> {
    match (driving_status, drive_id) {
        (DrivingStatus::Moving, None) => Err(ValidationError::StateRule(
            "current_drive_id is required when driving_status is MOVING".to_string(),
        )),
        (DrivingStatus::Idle, Some(_)) => Err(ValidationError::StateRule(
            "current_drive_id must be null when driving_status is IDLE".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Integers, or floats with no fractional part.
fn whole_number(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Drive ids are UUIDs, stored in hyphenated lowercase form.
fn parse_drive_id(raw: &str) -> Result<String, ValidationError> {
    Uuid::parse_str(raw)
        .map(|id| id.hyphenated().to_string())
        .map_err(|e| {
            ValidationError::Schema(format!("current_drive_id {raw:?} is not a UUID: {e}"))
        })
}

/// RFC 3339 strings keep their offset; naive strings are read as UTC; numbers
/// are Unix seconds.
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, ValidationError> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n
            .as_f64()
            .filter(|secs| secs.is_finite())
            .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0).round() as i64))
            .ok_or_else(|| ValidationError::Schema(format!("timestamp {n} out of range"))),
        other => Err(ValidationError::Schema(format!(
            "timestamp must be a string, got {}",
            json_type_name(other)
        ))),
    }
}

fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(s) {
        return Ok(with_offset.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::Schema(format!("unparseable timestamp {s:?}")))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

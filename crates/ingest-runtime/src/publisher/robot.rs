//! Simulated robot state.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde_json::{json, Value};
use uuid::Uuid;

/// Chance per tick that a robot starts or finishes a drive.
const TOGGLE_PROBABILITY: f64 = 0.1;
/// Largest per-tick position change while moving, in degrees.
const POSITION_STEP: f64 = 0.00005;

/// One simulated robot. Battery drains while moving and charges while idle.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    serial: String,
    latitude: f64,
    longitude: f64,
    height: f64,
    battery_level: u8,
    drive_id: Option<Uuid>,
}

impl SimulatedRobot {
    /// A fully charged, idle robot near the depot.
    pub fn new<R: Rng>(serial: impl Into<String>, rng: &mut R) -> Self {
        Self {
            serial: serial.into(),
            latitude: 37.4 + rng.gen_range(0.0..0.01),
            longitude: 127.1 + rng.gen_range(0.0..0.01),
            height: 0.0,
            battery_level: 100,
            drive_id: None,
        }
    }

    /// `ROBOT-0001` style serial for the `index`-th robot, counting from 1.
    pub fn serial_for(index: usize) -> String {
        format!("ROBOT-{index:04}")
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn is_moving(&self) -> bool {
        self.drive_id.is_some()
    }

    pub fn battery_level(&self) -> u8 {
        self.battery_level
    }

    /// Advance one tick and render the status payload.
    pub fn tick<R: Rng>(&mut self, rng: &mut R, now: DateTime<Utc>) -> Value {
        if rng.gen_bool(TOGGLE_PROBABILITY) {
            self.drive_id = match self.drive_id {
                Some(_) => None,
                None => Some(Uuid::new_v4()),
            };
        }

        let battery_status = if self.is_moving() {
            self.battery_level = self.battery_level.saturating_sub(1).max(1);
            self.latitude += rng.gen_range(-POSITION_STEP..POSITION_STEP);
            self.longitude += rng.gen_range(-POSITION_STEP..POSITION_STEP);
            self.height = round_to(rng.gen_range(0.0..0.5), 2);
            "DISCHARGING"
        } else {
            self.battery_level = self.battery_level.saturating_add(1).min(100);
            "CHARGING"
        };

        json!({
            "robot_id": self.serial,
            "timestamp": now.to_rfc3339_opts(SecondsFormat::Micros, true),
            "battery_level": self.battery_level,
            "battery_status": battery_status,
            "driving_status": if self.is_moving() { "MOVING" } else { "IDLE" },
            "current_drive_id": self.drive_id.map(|id| id.to_string()),
            "location": {
                "latitude": round_to(self.latitude, 6),
                "longitude": round_to(self.longitude, 6),
                "height": self.height,
            },
        })
    }
}

/// Break the drive-id rule: drop the id of a moving robot, or give an idle
/// robot one.
pub fn corrupt_drive_rule(payload: &mut Value) {
    let moving = payload["driving_status"] == "MOVING";
    payload["current_drive_id"] = if moving {
        Value::Null
    } else {
        Value::from(Uuid::new_v4().to_string())
    };
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

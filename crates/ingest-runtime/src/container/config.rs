//! # Runtime Configuration
//!
//! Unified configuration for the bus connection, storage, fanout and HTTP
//! surface.
//!
//! Every value has a default. Unparseable values are logged and replaced by
//! the default; [`RuntimeConfig::validate`] rejects values that parse but
//! cannot work.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use fleet_telemetry::TelemetryConfig;
use rt_01_status_validation::TopicFormat;
use rt_02_bus_connection::MqttConfig;
use rt_04_api_gateway::GatewayConfig;
use shared_fanout::DEFAULT_CHANNEL_CAPACITY;
use thiserror::Error;
use tracing::warn;

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Logging and liveness settings.
    pub telemetry: TelemetryConfig,
    /// Broker connection.
    pub mqtt: MqttConfig,
    /// Status topic layout.
    pub topics: TopicFormat,
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// HTTP listener.
    pub gateway: GatewayConfig,
    /// Events buffered per live subscriber before drops start.
    pub fanout_capacity: usize,
    /// Whether live observers receive the raw payload.
    pub forward_raw_payload: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            telemetry: TelemetryConfig::default(),
            mqtt: MqttConfig::default(),
            topics: TopicFormat::default(),
            database_url: None,
            gateway: GatewayConfig::default(),
            fanout_capacity: DEFAULT_CHANNEL_CAPACITY,
            forward_raw_payload: true,
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `MQTT_HOST`, `MQTT_PORT` (default `localhost:1883`)
    /// - `MQTT_USERNAME`, `MQTT_PASSWORD` (unset: anonymous)
    /// - `MQTT_CLIENT_ID` (default `robot-telemetry-ingest`)
    /// - `DATABASE_URL` (unset: in-memory store)
    /// - `HTTP_PORT` (default 8000)
    /// - `FANOUT_CAPACITY` (default 1000)
    /// - `FORWARD_RAW_PAYLOAD` (default true)
    ///
    /// Telemetry variables are documented on [`TelemetryConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            telemetry: TelemetryConfig::from_env(),
            ..Self::from_lookup(|name| env::var(name).ok())
        }
    }

    /// Load from an arbitrary variable source. Telemetry stays at defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mqtt = MqttConfig {
            host: non_empty("MQTT_HOST").unwrap_or(defaults.mqtt.host.clone()),
            port: parse_var(&lookup, "MQTT_PORT", defaults.mqtt.port),
            client_id: non_empty("MQTT_CLIENT_ID").unwrap_or(defaults.mqtt.client_id.clone()),
            username: non_empty("MQTT_USERNAME"),
            password: lookup("MQTT_PASSWORD"),
            ..defaults.mqtt
        };

        let gateway = GatewayConfig {
            port: parse_var(&lookup, "HTTP_PORT", defaults.gateway.port),
            ..defaults.gateway
        };

        Self {
            telemetry: defaults.telemetry,
            mqtt,
            topics: defaults.topics,
            database_url: non_empty("DATABASE_URL"),
            gateway,
            fanout_capacity: parse_var(&lookup, "FANOUT_CAPACITY", defaults.fanout_capacity),
            forward_raw_payload: bool_var(
                &lookup,
                "FORWARD_RAW_PAYLOAD",
                defaults.forward_raw_payload,
            ),
        }
    }

    /// Reject settings that parse but cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fanout_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "FANOUT_CAPACITY",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.mqtt.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "MQTT_CLIENT_ID",
                reason: "must not be empty".to_string(),
            });
        }
        if self.telemetry.active_refresh < Duration::from_secs(1) {
            return Err(ConfigError::Invalid {
                name: "ACTIVE_REFRESH_SEC",
                reason: "must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Parse `name` from `lookup`, falling back to `default` when unset or
/// unparseable.
pub(crate) fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!(var = name, value = %raw, error = %e, default = %default, "Invalid value, using default");
                default
            }
        },
        None => default,
    }
}

/// Accepts `1/true/yes/y/on` and `0/false/no/n/off`, case-insensitive.
pub(crate) fn bool_var(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => true,
        "0" | "false" | "no" | "n" | "off" => false,
        _ => {
            warn!(var = name, value = %raw, default, "Invalid boolean, using default");
            default
        }
    }
}

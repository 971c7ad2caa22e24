//! Transport adapters.

pub mod mqtt;

pub use mqtt::{MqttConfig, MqttSession, MqttTransport};

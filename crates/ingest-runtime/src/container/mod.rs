//! # Service Container
//!
//! Configuration and the component graph built from it.

pub mod components;
pub mod config;

pub use components::{IngestContainer, Orchestrator};
pub use config::{ConfigError, RuntimeConfig};

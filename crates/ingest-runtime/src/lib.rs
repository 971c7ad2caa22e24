//! # Ingest Runtime Library
//!
//! Wiring and lifecycle for the robot telemetry ingest service. The binaries
//! in this crate are thin wrappers around it.
//!
//! ## Modules
//!
//! - `container/` - configuration and the component graph
//! - `runtime` - starts and stops the bus consumer, liveness refresher and
//!   HTTP server
//! - `publisher/` - simulated robot fleet for local runs
//!
//! ## Data Flow
//!
//! ```text
//! MQTT broker ──robot/+/status──→ ConnectionManager
//!                                        │ RawEvent
//!                                        ↓
//!                              IngestionOrchestrator
//!                     validate → metrics/liveness → insert
//!                                        │ stored
//!                                        ↓
//!                                 FanoutRegistry ──SSE──→ /robots/{id}/feed
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod publisher;
pub mod runtime;

pub use container::{ConfigError, IngestContainer, RuntimeConfig};
pub use runtime::{IngestRuntime, RuntimeError};

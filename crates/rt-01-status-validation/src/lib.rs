//! # RT-01 Status Validation
//!
//! Decodes and checks one raw bus message against the status schema and the
//! drive-id business rule.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): pure checks
//!   - `TopicFormat`: `robot/<robot_id>/status` parsing and the wildcard filter
//!   - `payload`: decode, schema coercion, timestamp defaulting, drive-id rule
//! - **Service Layer** (`service`): `StatusValidator`, the single entry point
//!
//! ## Invariants
//!
//! - `battery_level` is within `1..=100`.
//! - `current_drive_id` is present exactly when `driving_status` is `MOVING`.
//! - No partially built event is ever returned.
//!
//! ## Usage Example
//!
//! ```ignore
//! use rt_01_status_validation::StatusValidator;
//!
//! let validator = StatusValidator::default();
//! match validator.validate("robot/R1/status", payload) {
//!     Ok(event) => persist(event),
//!     Err(e) => metrics.record_invalid(e.kind().as_str()),
//! }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod error;
pub mod service;

pub use domain::TopicFormat;
pub use error::{FailureKind, ValidationError};
pub use service::StatusValidator;

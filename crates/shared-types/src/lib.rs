//! # Shared Types Crate
//!
//! Domain entities shared by every stage of the ingest pipeline: the raw bus
//! message, the validated `StatusEvent` and its wire enums, and the storage
//! error type returned by persistence adapters.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-crate types are defined here.
//! - **Topic Identity**: a `StatusEvent`'s `robot_id` comes from the bus topic,
//!   never from the payload body.
//! - **Immutable Events**: validated events are built once and only read
//!   afterwards.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;

//! # Shared Fanout - Live Status Distribution
//!
//! Redistributes each persisted status event to every live observer of that
//! robot.
//!
//! ```text
//!                      ┌──────────────────┐   register(R1)   ┌────────────┐
//!  Ingestion ────────→ │  FanoutRegistry  │ ←─────────────── │ Observer A │
//!   broadcast(R1, e)   │                  │ ───── e ───────→ │            │
//!                      │  R1 → {A, B}     │                  └────────────┘
//!                      │  R2 → {C}        │ ───── e ───────→ Observer B
//!                      └──────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Every mutation (register, unregister, broadcast) happens under one lock
//!   over the whole subscriber map.
//! - `broadcast` never waits: a full subscriber queue loses that event for that
//!   subscriber only.
//! - A subscriber registered after a broadcast never observes it.
//! - Dropping a [`Subscription`] unregisters it exactly once.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod registry;
pub mod subscription;

pub use registry::{FanoutRegistry, FanoutStats};
pub use subscription::{Subscription, SubscriptionError};

use std::sync::Arc;

/// One serialized status event as delivered to observers.
pub type FanoutMessage = Arc<str>;

/// Identifies one delivery channel inside the registry.
pub type SubscriberId = u64;

/// Maximum events buffered per subscriber before new events are dropped for it.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

//! # RT-02 Bus Connection
//!
//! Maintains one live subscription to the robot status topic filter and
//! delivers every inbound message, in arrival order, to a handler.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `Backoff`, `BackoffPolicy`, `ConnectionState`
//! - **Ports Layer** (`ports/`)
//!   - `RawEventHandler`: driving port, receives raw messages
//!   - `BusTransport` / `BusSession`: driven port, the broker client
//! - **Service Layer** (`service/`): `ConnectionManager`, the reconnect loop
//! - **Adapters Layer** (`adapters/`): `MqttTransport` over `rumqttc`
//!
//! ## State Machine
//!
//! ```text
//! Disconnected → Connecting ──ok──→ Connected ──transport error──┐
//!                    ↑                                           ↓
//!                    └──────────── timer elapses ──────── Backoff(delay)
//! ```
//!
//! The delay starts at 1s, doubles per failure up to 30s, and resets when a
//! subscription succeeds. Only the shutdown signal stops the loop.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{MqttConfig, MqttTransport};
pub use domain::{Backoff, BackoffPolicy, ConnectionState};
pub use error::TransportError;
pub use ports::{BusSession, BusTransport, RawEventHandler};
pub use service::ConnectionManager;

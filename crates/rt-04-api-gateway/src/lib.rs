//! # RT-04 API Gateway
//!
//! HTTP surface of the ingest service.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /robots/{robot_id}/feed` | Server-Sent Events, one frame per stored status |
//! | `GET /robots/{robot_id}/history` | Range query over stored statuses |
//! | `GET /health` | Storage reachability |
//! | `GET /metrics` | Prometheus text exposition |
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `GatewayConfig`, `ApiError`, `GatewayError`
//! - **Handlers** (`handlers/`): one module per route group
//! - **Router** (`router.rs`): `AppState` and middleware stack
//! - **Service** (`service.rs`): bind, serve, graceful shutdown
//!
//! Live feeds hold one fanout subscription each. Closing the HTTP connection
//! drops the body stream, which unregisters the subscription.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod handlers;
pub mod router;
pub mod service;

pub use domain::{ApiError, GatewayConfig, GatewayError};
pub use router::{build_router, AppState};
pub use service::{serve, serve_on};

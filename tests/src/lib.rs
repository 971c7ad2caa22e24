//! # Robot Telemetry Ingest Test Suite
//!
//! Cross-crate flows that no single crate can test on its own.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs            # In-process fake broker and payload fixtures
//! └── integration/
//!     ├── pipeline_flows.rs # validate → persist → fanout scenarios
//!     ├── reconnect_flows.rs# connection loss and backoff under load
//!     └── runtime_flows.rs  # full runtime over real HTTP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rt-tests
//! cargo test -p rt-tests integration::reconnect_flows
//! ```

#![allow(dead_code)]

pub mod integration;
pub mod support;

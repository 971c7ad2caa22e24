//! Gateway domain: configuration and error mapping.

mod config;
mod error;

pub use config::GatewayConfig;
pub use error::{ApiError, GatewayError};

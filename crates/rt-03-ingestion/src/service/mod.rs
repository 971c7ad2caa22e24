//! Service layer.

pub mod orchestrator;

pub use orchestrator::IngestionOrchestrator;

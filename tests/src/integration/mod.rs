//! Cross-crate integration flows.

mod pipeline_flows;
mod reconnect_flows;
mod runtime_flows;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use fleet_telemetry::IngestMetrics;
use rt_03_ingestion::StatusStore;
use shared_fanout::FanoutRegistry;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::domain::GatewayConfig;
use crate::handlers;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub fanout: FanoutRegistry,
    pub store: Arc<dyn StatusStore>,
    pub metrics: Arc<IngestMetrics>,
    /// Live feeds end when this turns `true`.
    pub shutdown: watch::Receiver<bool>,
}

/// Build the HTTP router.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/robots/:robot_id/feed", get(handlers::feed::robot_feed))
        .route(
            "/robots/:robot_id/history",
            get(handlers::history::robot_history),
        )
        .route("/health", get(handlers::ops::health))
        .route("/metrics", get(handlers::ops::metrics))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! HTTP server lifecycle.

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::domain::{GatewayConfig, GatewayError};
use crate::router::{build_router, AppState};

/// Bind and serve until `state.shutdown` turns `true` (or its sender is
/// dropped). In-flight requests finish; live feeds end on the same signal.
pub async fn serve(config: GatewayConfig, state: AppState) -> Result<(), GatewayError> {
    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
    serve_on(listener, config, state).await
}

/// Serve on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    config: GatewayConfig,
    state: AppState,
) -> Result<(), GatewayError> {
    let local = listener
        .local_addr()
        .map_err(|e| GatewayError::Bind(e.to_string()))?;
    let mut shutdown = state.shutdown.clone();
    let router = build_router(state, &config);

    info!(addr = %local, "HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { wait_for_shutdown(&mut shutdown).await })
        .await
        .map_err(|e| GatewayError::Serve(e.to_string()))?;
    info!("HTTP server stopped");
    Ok(())
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

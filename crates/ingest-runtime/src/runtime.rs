//! Process lifecycle: start the bus consumer, the liveness refresher and the
//! HTTP server, then stop them together.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rt_02_bus_connection::{BusTransport, ConnectionManager, ConnectionState, MqttTransport};
use rt_04_api_gateway::{AppState, GatewayError};
use shared_types::StorageError;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{ConfigError, IngestContainer, RuntimeConfig};

/// How long each task gets to wind down after the shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// A running ingest service.
pub struct IngestRuntime {
    container: Arc<IngestContainer>,
    http_addr: SocketAddr,
    connection_state: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl IngestRuntime {
    /// Validate `config`, open the store and start against the MQTT broker.
    pub async fn start(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let transport = MqttTransport::new(config.mqtt.clone());
        let container = IngestContainer::from_config(config).await?;
        Self::start_with_transport(container, transport).await
    }

    /// Start with an already wired container and any bus transport.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Bind the HTTP listener (fails fast on a taken port)
    /// 2. Spawn the connection manager feeding the orchestrator
    /// 3. Spawn the liveness refresher
    /// 4. Spawn the HTTP server
    pub async fn start_with_transport<T>(
        container: IngestContainer,
        transport: T,
    ) -> Result<Self, RuntimeError>
    where
        T: BusTransport + 'static,
    {
        let container = Arc::new(container);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let addr = container.config.gateway.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        let http_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        let manager =
            ConnectionManager::new(transport, container.config.topics.subscription_filter());
        let connection_state = manager.state();

        let tasks = vec![
            (
                "bus-connection",
                spawn_bus_connection(manager, &container, shutdown_rx.clone()),
            ),
            (
                "liveness-refresher",
                spawn_liveness_refresher(&container, shutdown_rx.clone()),
            ),
            (
                "http-server",
                spawn_http_server(listener, &container, shutdown_rx),
            ),
        ];

        info!(
            http_addr = %http_addr,
            filter = %container.config.topics.subscription_filter(),
            fanout_capacity = container.config.fanout_capacity,
            "Ingest runtime started"
        );

        Ok(Self {
            container,
            http_addr,
            connection_state,
            shutdown_tx,
            tasks,
        })
    }

    /// Address the HTTP server is bound to.
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn container(&self) -> Arc<IngestContainer> {
        Arc::clone(&self.container)
    }

    /// Bus connection state updates.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection_state.clone()
    }

    /// Signal every task to stop and wait for them.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Flip the shutdown channel: the connection manager closes its
    ///    session, live feeds end, the HTTP server stops accepting
    /// 2. Await each task for at most [`SHUTDOWN_GRACE`]
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        self.shutdown_tx.send_replace(true);

        for (name, task) in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(task = name, error = %e, "Task ended abnormally"),
                Err(_) => warn!(task = name, "Task did not stop within grace period"),
            }
        }

        info!("Shutdown complete");
    }
}

fn spawn_bus_connection<T>(
    manager: ConnectionManager<T>,
    container: &Arc<IngestContainer>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    T: BusTransport + 'static,
{
    let orchestrator = Arc::clone(&container.orchestrator);
    tokio::spawn(async move {
        manager.run(orchestrator.as_ref(), shutdown).await;
    })
}

/// Periodically recompute active/stale robot gauges and the live-subscriber
/// gauge, so they move even when no messages arrive.
fn spawn_liveness_refresher(
    container: &Arc<IngestContainer>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let container = Arc::clone(container);
    let period = container.config.telemetry.active_refresh;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    refresh_gauges(&container);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

fn refresh_gauges(container: &IngestContainer) {
    let snapshot = container.liveness.recompute(Utc::now());
    container.metrics.set_liveness(snapshot);
    container
        .metrics
        .set_live_subscribers(container.fanout.subscriber_count());
}

fn spawn_http_server(
    listener: TcpListener,
    container: &Arc<IngestContainer>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let config = container.config.gateway.clone();
    let state = AppState {
        fanout: container.fanout.clone(),
        store: Arc::clone(&container.store),
        metrics: Arc::clone(&container.metrics),
        shutdown,
    };
    tokio::spawn(async move {
        if let Err(e) = rt_04_api_gateway::serve_on(listener, config, state).await {
            error!(error = %e, "HTTP server failed");
        }
    })
}

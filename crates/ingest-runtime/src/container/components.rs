//! # Ingest Container
//!
//! Holds every long-lived component of the service and wires them together:
//! one store, one fanout registry, one metrics set and liveness tracker, and
//! the orchestrator that drives them.

use std::sync::Arc;

use fleet_telemetry::{IngestMetrics, LivenessTracker, INGEST_METRICS};
use rt_01_status_validation::StatusValidator;
use rt_03_ingestion::{InMemoryStatusStore, IngestionOrchestrator, StatusStore};
use shared_fanout::FanoutRegistry;
use shared_types::StorageError;
use tracing::{info, warn};

use super::RuntimeConfig;

/// The pipeline's orchestrator over a runtime-selected store.
pub type Orchestrator = IngestionOrchestrator<dyn StatusStore>;

pub struct IngestContainer {
    pub config: RuntimeConfig,
    pub store: Arc<dyn StatusStore>,
    pub fanout: FanoutRegistry,
    pub metrics: Arc<IngestMetrics>,
    pub liveness: Arc<LivenessTracker>,
    pub orchestrator: Arc<Orchestrator>,
}

impl IngestContainer {
    /// Wire components around an existing store and metrics set.
    pub fn new(
        config: RuntimeConfig,
        store: Arc<dyn StatusStore>,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        let fanout = FanoutRegistry::with_capacity(config.fanout_capacity);
        let liveness = Arc::new(LivenessTracker::new(config.telemetry.active_window));
        let orchestrator = IngestionOrchestrator::new(
            StatusValidator::new(config.topics.clone()),
            Arc::clone(&store),
            fanout.clone(),
            Arc::clone(&metrics),
            Arc::clone(&liveness),
        )
        .with_raw_payload_forwarding(config.forward_raw_payload);

        Self {
            config,
            store,
            fanout,
            metrics,
            liveness,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Select the store from `config.database_url` and use the process-wide
    /// metrics registry.
    pub async fn from_config(config: RuntimeConfig) -> Result<Self, StorageError> {
        let store = open_store(config.database_url.as_deref()).await?;
        Ok(Self::new(config, store, Arc::clone(&INGEST_METRICS)))
    }
}

#[cfg(feature = "postgres")]
async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn StatusStore>, StorageError> {
    match database_url {
        Some(url) => {
            let store = rt_03_ingestion::PostgresStatusStore::connect(url).await?;
            info!("Using PostgreSQL status store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, status history is kept in memory only");
            Ok(Arc::new(InMemoryStatusStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn StatusStore>, StorageError> {
    if database_url.is_some() {
        warn!("Built without the postgres feature, ignoring DATABASE_URL");
    }
    info!("Using in-memory status store");
    Ok(Arc::new(InMemoryStatusStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{RawEvent, RobotId};

    #[tokio::test]
    async fn test_container_wires_pipeline() {
        let config = RuntimeConfig {
            fanout_capacity: 4,
            forward_raw_payload: false,
            ..RuntimeConfig::default()
        };
        let store = Arc::new(InMemoryStatusStore::new());
        let container =
            IngestContainer::new(config, store.clone(), Arc::new(IngestMetrics::new().unwrap()));
        assert_eq!(container.fanout.capacity(), 4);

        let mut sub = container.fanout.register(RobotId::new("R1"));
        let body = br#"{"battery_level":50,"battery_status":"CHARGING","driving_status":"IDLE",
            "location":{"latitude":1,"longitude":2,"height":0},"firmware":"x"}"#;
        container
            .orchestrator
            .process(RawEvent::new("robot/R1/status", body.to_vec()))
            .await;

        assert_eq!(store.len(), 1);
        let delivered: serde_json::Value =
            serde_json::from_str(&sub.try_recv().unwrap().unwrap()).unwrap();
        assert!(delivered["payload"].is_null());
        assert_eq!(container.metrics.db_insert.get(), 1);
    }

    #[tokio::test]
    async fn test_missing_database_url_selects_memory_store() {
        let store = open_store(None).await.unwrap();
        assert!(store.ping().await.is_ok());
    }
}

//! PostgreSQL status store backed by `tokio-postgres`.
//!
//! Writes into the externally managed `robot_status_history` table:
//!
//! ```text
//! serial_number    TEXT
//! ts               TIMESTAMPTZ
//! battery_level    INTEGER
//! battery_status   battery_status_enum ('CHARGING', 'DISCHARGING')
//! driving_status   driving_status_enum ('IDLE', 'MOVING')
//! current_drive_id UUID NULL
//! latitude, longitude, height  DOUBLE PRECISION
//! payload          JSONB NULL
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use shared_types::{
    BatteryStatus, DrivingStatus, Location, RobotId, StatusEvent, StorageError,
};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info};

use crate::domain::HistoryQuery;
use crate::ports::{HistoryReader, PersistenceGateway};

pub const TABLE_STATUS_HISTORY: &str = "robot_status_history";

const INSERT_SQL: &str = r#"
    INSERT INTO robot_status_history (
        serial_number, ts, battery_level, battery_status, driving_status,
        current_drive_id, latitude, longitude, height, payload
    )
    VALUES (
        $1, $2, $3,
        CAST($4::text AS battery_status_enum),
        CAST($5::text AS driving_status_enum),
        CAST($6::text AS uuid),
        $7, $8, $9, $10
    )
"#;

const HISTORY_SQL: &str = r#"
    SELECT serial_number, ts, battery_level,
           battery_status::text AS battery_status,
           driving_status::text AS driving_status,
           current_drive_id::text AS current_drive_id,
           latitude, longitude, height,
           CASE WHEN $5 THEN payload ELSE NULL END AS payload
    FROM robot_status_history
    WHERE serial_number = $1 AND ts BETWEEN $2 AND $3
    ORDER BY ts ASC
    LIMIT $4
"#;

#[derive(Clone)]
pub struct PostgresStatusStore {
    client: Arc<Client>,
}

impl PostgresStatusStore {
    /// Connect and drive the connection on a background task.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Postgres connection error");
            }
        });

        info!(table = TABLE_STATUS_HISTORY, "Connected to Postgres");
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl PersistenceGateway for PostgresStatusStore {
    async fn insert(&self, event: &StatusEvent) -> Result<(), StorageError> {
        let payload = Value::Object(event.raw_payload.clone());
        self.client
            .execute(
                INSERT_SQL,
                &[
                    &event.robot_id.as_str(),
                    &event.timestamp,
                    &i32::from(event.battery_level),
                    &event.battery_status.as_str(),
                    &event.driving_status.as_str(),
                    &event.active_drive_id.as_deref(),
                    &event.location.latitude,
                    &event.location.longitude,
                    &event.location.height,
                    &payload,
                ],
            )
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        if self.client.is_closed() {
            return Err(StorageError::Unavailable("connection closed".to_string()));
        }
        self.client
            .simple_query("SELECT 1")
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl HistoryReader for PostgresStatusStore {
    async fn history(&self, query: &HistoryQuery) -> Result<Vec<StatusEvent>, StorageError> {
        let limit = query.limit as i64;
        let rows = self
            .client
            .query(
                HISTORY_SQL,
                &[
                    &query.robot_id.as_str(),
                    &query.start,
                    &query.end,
                    &limit,
                    &query.include_payload,
                ],
            )
            .await
            .map_err(storage_error)?;

        rows.iter().map(row_to_event).collect()
    }
}

fn row_to_event(row: &Row) -> Result<StatusEvent, StorageError> {
    let robot_id: String = row.try_get("serial_number").map_err(corrupt)?;
    let timestamp: DateTime<Utc> = row.try_get("ts").map_err(corrupt)?;
    let battery_level: i32 = row.try_get("battery_level").map_err(corrupt)?;
    let battery_status: String = row.try_get("battery_status").map_err(corrupt)?;
    let driving_status: String = row.try_get("driving_status").map_err(corrupt)?;
    let payload: Option<Value> = row.try_get("payload").map_err(corrupt)?;

    Ok(StatusEvent {
        robot_id: RobotId::new(robot_id),
        timestamp,
        battery_level: u8::try_from(battery_level).map_err(|_| {
            StorageError::DataCorruption(format!("battery_level {battery_level} out of range"))
        })?,
        battery_status: battery_status
            .parse::<BatteryStatus>()
            .map_err(|e| StorageError::DataCorruption(e.to_string()))?,
        driving_status: driving_status
            .parse::<DrivingStatus>()
            .map_err(|e| StorageError::DataCorruption(e.to_string()))?,
        active_drive_id: row.try_get("current_drive_id").map_err(corrupt)?,
        location: Location {
            latitude: row.try_get("latitude").map_err(corrupt)?,
            longitude: row.try_get("longitude").map_err(corrupt)?,
            height: row.try_get("height").map_err(corrupt)?,
        },
        raw_payload: match payload {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        },
    })
}

fn storage_error(e: tokio_postgres::Error) -> StorageError {
    if e.is_closed() {
        StorageError::Unavailable(e.to_string())
    } else {
        StorageError::DatabaseError(e.to_string())
    }
}

fn corrupt(e: tokio_postgres::Error) -> StorageError {
    StorageError::DataCorruption(e.to_string())
}

//! Historical range queries.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rt_03_ingestion::{HistoryQuery, DEFAULT_HISTORY_LIMIT};
use serde::Deserialize;
use serde_json::Value;
use shared_types::RobotId;
use tracing::debug;

use crate::domain::ApiError;
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub include_payload: bool,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// `GET /robots/{robot_id}/history?start_time&end_time&include_payload&limit`
pub async fn robot_history(
    State(state): State<AppState>,
    Path(robot_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let start = parse_datetime(&params.start_time)?;
    let end = parse_datetime(&params.end_time)?;
    let query = HistoryQuery::new(RobotId::new(robot_id), start, end)?
        .with_limit(params.limit)?
        .with_payload(params.include_payload);

    let events = state.store.history(&query).await?;
    debug!(robot_id = %query.robot_id, rows = events.len(), "History query served");

    let rows = events
        .iter()
        .map(|event| serde_json::to_value(event.to_record(query.include_payload)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(rows))
}

/// ISO-8601 with or without offset, or a bare date. Naive values are UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, ApiError> {
    let value = value.trim();
    // A `+` offset arrives as a space when the client did not encode it.
    let candidates = [value.to_string(), value.replacen(' ', "+", 1)];

    for candidate in &candidates {
        if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(ApiError::BadRequest("Invalid datetime format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_datetime_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for value in [
            "2025-01-01T00:00:00Z",
            "2025-01-01T01:00:00+01:00",
            "2025-01-01T01:00:00 01:00",
            "2025-01-01T00:00:00",
            "2025-01-01 00:00:00",
            "2025-01-01",
        ] {
            assert_eq!(parse_datetime(value).unwrap(), expected, "{value}");
        }
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        for value in ["", "yesterday", "2025-13-01T00:00:00Z"] {
            assert!(matches!(parse_datetime(value), Err(ApiError::BadRequest(_))));
        }
    }
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::ErrorTrigger;
use crate::store::{ProbeStore, Reading, SignalQuality};
use crate::telemetry::{tendency, IngestError, ProbeReport, TelemetryIngestor};
use crate::watchdog::HeartbeatCell;

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<ProbeStore>,
    pub ingestor: TelemetryIngestor,
    pub errors: Arc<ErrorTrigger>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Probe Submission
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub machine_name: String,
    #[serde(default)]
    pub temperature: String,
    #[serde(default)]
    pub signal_strength: i32,
    #[serde(default)]
    pub first_loop_since_boot: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub is_too_hot: bool,
    pub is_too_cold: bool,
    pub send_frequency_seconds: u32,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let report = ProbeReport {
        machine_name: request.machine_name,
        temperature: request.temperature,
        signal_strength: request.signal_strength,
        first_loop_since_boot: request.first_loop_since_boot,
    };

    let outcome = state.ingestor.ingest(report).await.map_err(|e| {
        state.errors.report(&e, "probe submission failed");
        ApiError::from(e)
    })?;

    Ok(Json(SubmitResponse {
        is_too_hot: outcome.probe.is_too_hot(outcome.temperature),
        is_too_cold: outcome.probe.is_too_cold(outcome.temperature),
        send_frequency_seconds: outcome.probe.send_frequency_secs,
    }))
}

// ============================================================================
// Dashboard Data
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub probes: Vec<ProbeOverview>,
    pub has_error: bool,
    pub last_error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOverview {
    pub id: u64,
    pub name: String,
    pub machine_name: String,
    pub color: String,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub send_frequency_seconds: u32,
    pub signal_strength: Option<i32>,
    pub signal_quality: SignalQuality,
    pub last_communication_at: Option<DateTime<Utc>>,
    pub last_booted_at: Option<DateTime<Utc>>,
    pub latest_temperature: Option<f64>,
    pub latest_reading_at: Option<DateTime<Utc>>,
    pub tendency: f64,
    pub minimum_tendency_change: f64,
}

pub async fn overview(State(state): State<Arc<AppState>>) -> Result<Json<OverviewResponse>, ApiError> {
    let now = Utc::now();
    let mut probes = Vec::new();

    for probe in state.store.list_probes() {
        let span = chrono::Duration::hours(probe.tendency_span_hours as i64);
        let readings = state
            .store
            .readings_since(probe.id, now - span)
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        // A reading only counts as current within one cadence plus slack
        let fresh_cut =
            now - chrono::Duration::seconds(probe.send_frequency_secs as i64 + 60);
        let latest = readings
            .iter()
            .filter(|r| r.timestamp >= fresh_cut)
            .max_by_key(|r| r.timestamp);

        probes.push(ProbeOverview {
            latest_temperature: latest.map(|r| r.temperature),
            latest_reading_at: latest.map(|r| r.timestamp),
            tendency: tendency(&readings, probe.tendency_span_hours, now),
            signal_quality: probe.signal_quality(),
            id: probe.id,
            name: probe.name,
            machine_name: probe.machine_name,
            color: probe.color,
            min_temperature: probe.min_temperature,
            max_temperature: probe.max_temperature,
            send_frequency_seconds: probe.send_frequency_secs,
            signal_strength: probe.signal_strength,
            last_communication_at: probe.last_communication_at,
            last_booted_at: probe.last_booted_at,
            minimum_tendency_change: probe.minimum_tendency_change,
        });
    }

    let last_error = state.errors.last_error();
    Ok(Json(OverviewResponse {
        probes,
        has_error: last_error.is_some(),
        last_error: last_error.map(|e| e.message),
    }))
}

#[derive(Deserialize)]
pub struct ReadingsQuery {
    /// Chart window in hours
    pub hours: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingsResponse {
    pub probe_id: u64,
    pub readings: Vec<Reading>,
}

pub async fn probe_readings(
    State(state): State<Arc<AppState>>,
    Path(probe_id): Path<u64>,
    Query(query): Query<ReadingsQuery>,
) -> Result<Json<ReadingsResponse>, ApiError> {
    let hours = query.hours.unwrap_or(24).clamp(1, 24 * 31);
    let since = Utc::now() - chrono::Duration::hours(hours);

    let readings = state
        .store
        .readings_since(probe_id, since)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    Ok(Json(ReadingsResponse { probe_id, readings }))
}

// ============================================================================
// Heartbeat (companion process)
// ============================================================================

pub async fn heartbeat_ping(State(cell): State<HeartbeatCell>) -> Json<serde_json::Value> {
    cell.record(Utc::now());
    Json(serde_json::json!({ "ok": true }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unprocessable(String),
    NotFound(String),
    Internal(String),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::MissingMachineName | IngestError::MissingTemperature => {
                ApiError::BadRequest(e.to_string())
            }
            IngestError::InvalidTemperature(_) => ApiError::Unprocessable(e.to_string()),
            IngestError::Store(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

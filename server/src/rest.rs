use crate::config::Config;
use crate::liveness::is_online;
use crate::metrics::{
    ALERTS_GENERATED_TOTAL, INGEST_LATENCY_SECONDS, INVALID_READINGS_TOTAL, READINGS_TOTAL,
};
use crate::model::{
    Alert, DeviceList, DeviceReadings, LoginRequest, PatientAlerts, PatientSummary, Reading,
    ReadingCreate, ReadingResponse, RegisterRequest,
};
use crate::vitals::{self, VitalStatus};
use crate::{db, validate};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct AppState {
    pool: PgPool,
    config: Config,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<i64>,
}

pub fn create_router(pool: PgPool, config: Config) -> Router {
    let state = AppState { pool, config };

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/readings", post(create_reading).get(get_readings))
        .route("/api/v1/readings/device/:device_id", get(get_device_readings))
        .route(
            "/api/v1/readings/patient/:patient_id/alerts",
            get(get_patient_alerts),
        )
        .route("/api/v1/devices", get(get_devices))
        .route("/api/v1/devices/:device_id/status", get(get_device_status))
        .route("/api/v1/esp32/data", post(esp32_data))
        .route("/api/v1/esp32/status/:device_id", get(esp32_status))
        .route("/api/v1/patients", get(get_patients))
        .route("/api/v1/patients/:patient_id/history", get(get_patient_history))
        .route("/api/v1/login", post(login))
        .route("/api/v1/register", post(register))
        .with_state(state)
}

/// What one accepted reading produced: the stored row, the alert messages
/// in generation order, and the single-label status.
struct IngestOutcome {
    reading: Reading,
    messages: Vec<String>,
    status: VitalStatus,
}

/// Classifies one reading under both policies and persists the outcome.
async fn ingest(state: &AppState, body: ReadingCreate) -> Result<IngestOutcome, ApiError> {
    if let Err(e) = validate::validate(&body) {
        INVALID_READINGS_TOTAL.inc();
        warn!("Rejected reading from {:?}: {}", body.device_id, e);
        return Err(e.into());
    }

    let started = Instant::now();
    let now = Utc::now();

    let vital_alerts = vitals::assess(body.heart_rate, body.temperature, &state.config.thresholds);
    let messages = vitals::alert_messages(&vital_alerts);
    let status = vitals::classify_status(body.heart_rate, body.temperature);

    // Device id doubles as the patient key throughout the system.
    let patient_id = body.device_id.clone();

    let reading = Reading {
        id: Uuid::new_v4(),
        device_id: body.device_id.clone(),
        patient_id: patient_id.clone(),
        heart_rate: body.heart_rate,
        temperature: body.temperature,
        status: status.as_str().to_string(),
        timestamp: now,
    };

    let alerts: Vec<Alert> = vital_alerts
        .iter()
        .map(|a| Alert {
            id: Uuid::new_v4(),
            patient_id: patient_id.clone(),
            device_id: body.device_id.clone(),
            alert_type: a.alert_type.as_str().to_string(),
            message: a.message.clone(),
            value: a.value,
            severity: a.severity.as_str().to_string(),
            timestamp: now,
            resolved: false,
        })
        .collect();

    db::persist_reading(&state.pool, &reading, &alerts).await?;

    READINGS_TOTAL.inc();
    ALERTS_GENERATED_TOTAL.inc_by(alerts.len() as f64);
    INGEST_LATENCY_SECONDS.observe(started.elapsed().as_secs_f64());

    info!(
        "Stored reading {} from {} (status={}, alerts={})",
        reading.id,
        reading.device_id,
        status,
        alerts.len()
    );

    Ok(IngestOutcome {
        reading,
        messages,
        status,
    })
}

async fn create_reading(
    State(state): State<AppState>,
    Json(body): Json<ReadingCreate>,
) -> Result<(StatusCode, Json<ReadingResponse>), ApiError> {
    let outcome = ingest(&state, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReadingResponse {
            status: "success".to_string(),
            reading_id: outcome.reading.id,
            alerts_count: outcome.messages.len(),
            alerts: outcome.messages,
        }),
    ))
}

async fn esp32_data(
    State(state): State<AppState>,
    Json(body): Json<ReadingCreate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = ingest(&state, body).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Reading accepted",
        "vital_status": outcome.status,
    })))
}

async fn get_readings(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = params.limit.unwrap_or(10).min(1000);
    let readings = db::recent_readings(&state.pool, limit).await?;

    Ok(Json(json!({ "readings": readings })))
}

async fn get_device_readings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<DeviceReadings>, ApiError> {
    let limit = params.limit.unwrap_or(100).min(1000);
    let readings = db::device_readings(&state.pool, &device_id, limit).await?;

    if readings.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No readings found for device {}",
            device_id
        )));
    }

    let statistics = db::device_statistics(&state.pool, &device_id).await?;
    let total_count = readings.len();

    Ok(Json(DeviceReadings {
        patient_id: device_id.clone(),
        device_id,
        readings,
        total_count,
        statistics,
    }))
}

async fn get_patient_alerts(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<PatientAlerts>, ApiError> {
    let limit = params.limit.unwrap_or(50).min(1000);
    let alerts = db::patient_alerts(&state.pool, &patient_id, limit).await?;
    let total_count = alerts.len();

    Ok(Json(PatientAlerts {
        patient_id,
        alerts,
        total_count,
    }))
}

async fn get_devices(State(state): State<AppState>) -> Result<Json<DeviceList>, ApiError> {
    let devices = db::list_devices(&state.pool).await?;
    let total_count = devices.len();

    Ok(Json(DeviceList {
        devices,
        total_count,
    }))
}

async fn get_device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let device = db::find_device(&state.pool, &device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Device {} not found", device_id)))?;

    // Liveness is derived from the last contact, not from the stored
    // "active" marker. A device with no readings on record is offline.
    let status = match device.last_reading {
        Some(last) => {
            if is_online(last, Utc::now(), state.config.liveness_window_secs) {
                "online"
            } else {
                "offline"
            }
        }
        None => "offline",
    };

    Ok(Json(json!({
        "device_id": device.device_id,
        "patient_id": device.patient_id,
        "status": status,
        "last_reading": device.last_reading,
        "total_readings": device.total_readings,
    })))
}

async fn esp32_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let last = db::last_device_reading(&state.pool, &device_id).await?;

    let Some(reading) = last else {
        return Ok(Json(json!({
            "status": "offline",
            "message": "No readings found",
        })));
    };

    let status = if is_online(reading.timestamp, Utc::now(), state.config.liveness_window_secs) {
        "online"
    } else {
        "offline"
    };

    Ok(Json(json!({
        "status": status,
        "last_reading": reading.timestamp,
        "heart_rate": reading.heart_rate,
        "temperature": reading.temperature,
        "vital_status": reading.status,
    })))
}

async fn get_patients(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let users = db::list_patients(&state.pool).await?;
    let now = Utc::now();

    let mut patients = Vec::with_capacity(users.len());
    for user in users {
        let Some(device_id) = user.device_id.clone() else {
            continue;
        };

        let device = db::find_device(&state.pool, &device_id).await?;
        let last = db::last_device_reading(&state.pool, &device_id).await?;

        let online = last
            .as_ref()
            .map(|r| is_online(r.timestamp, now, state.config.liveness_window_secs))
            .unwrap_or(false);
        let status = if online { "online" } else { "offline" };

        patients.push(PatientSummary {
            id: user.id,
            name: user.name,
            device_id,
            status: status.to_string(),
            last_reading: last.as_ref().map(|r| r.timestamp),
            heart_rate: last.as_ref().map(|r| r.heart_rate),
            temperature: last.as_ref().map(|r| r.temperature),
            vital_status: last.as_ref().map(|r| r.status.clone()),
            total_readings: device.map(|d| d.total_readings).unwrap_or(0),
        });
    }

    Ok(Json(json!({ "patients": patients })))
}

async fn get_patient_history(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = params.limit.unwrap_or(100).min(1000);
    let readings = db::patient_readings(&state.pool, &patient_id, limit).await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "readings": readings,
    })))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = if body.user_type == "patient" {
        // Patients authenticate with their device id in the email field.
        db::find_patient_by_device(&state.pool, &body.email)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Device ID not found".to_string()))?
    } else {
        db::find_doctor(&state.pool, &body.email, &body.password)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?
    };

    Ok(Json(json!({
        "status": "success",
        "user": {
            "id": user.id,
            "name": user.name,
            "email": body.email,
            "type": user.user_type,
        },
    })))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.user_type == "patient" {
        if db::find_patient_by_device(&state.pool, &body.email)
            .await?
            .is_some()
        {
            return Err(ApiError::Validation(
                "Device ID already registered".to_string(),
            ));
        }
        db::create_patient(&state.pool, &body.name, &body.email).await?;
    } else if body.user_type == "doctor" {
        if db::find_user_by_email(&state.pool, &body.email).await?.is_some() {
            return Err(ApiError::Validation("Email already registered".to_string()));
        }
        db::create_doctor(&state.pool, &body.name, &body.email, &body.password).await?;
    } else {
        return Err(ApiError::Validation(format!(
            "Unknown user type: {}",
            body.user_type
        )));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "User registered",
    })))
}

async fn health(State(state): State<AppState>) -> Response {
    match db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        )
            .into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "disconnected" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl From<crate::errors::Error> for ApiError {
    fn from(err: crate::errors::Error) -> Self {
        match err {
            crate::errors::Error::Validation(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                error!("API error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = self.to_string();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One timestamped vital-sign sample from a device. Append-only: created by
/// ingestion, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: Uuid,
    pub device_id: String,
    pub patient_id: String,
    pub heart_rate: i32,
    pub temperature: f64,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// A record generated when a reading crosses a configured threshold. Carries
/// the reading's values at the moment of ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub patient_id: String,
    pub device_id: String,
    pub alert_type: String,
    pub message: String,
    pub value: f64,
    pub severity: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

/// Aggregated last-known state and counters for one device, upserted on
/// every ingested reading.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceStatus {
    pub device_id: String,
    pub patient_id: String,
    pub status: String,
    pub last_reading: Option<DateTime<Utc>>,
    pub total_readings: i64,
}

/// Registered account: a patient keyed by device id or a doctor keyed by
/// email.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub user_type: String,
    pub email: Option<String>,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ingest request body shared by the dashboard and device endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingCreate {
    pub device_id: String,
    pub heart_rate: i32,
    pub temperature: f64,
}

#[derive(Debug, Serialize)]
pub struct ReadingResponse {
    pub status: String,
    pub reading_id: Uuid,
    pub alerts_count: usize,
    pub alerts: Vec<String>,
}

/// Aggregate statistics over a device's stored readings. Aggregates are
/// `None` when the device has no readings.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ReadingStatistics {
    pub avg_heart_rate: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub min_heart_rate: Option<i32>,
    pub max_heart_rate: Option<i32>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub total_readings: i64,
}

#[derive(Debug, Serialize)]
pub struct DeviceReadings {
    pub patient_id: String,
    pub device_id: String,
    pub readings: Vec<Reading>,
    pub total_count: usize,
    pub statistics: ReadingStatistics,
}

#[derive(Debug, Serialize)]
pub struct PatientAlerts {
    pub patient_id: String,
    pub alerts: Vec<Alert>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeviceList {
    pub devices: Vec<DeviceStatus>,
    pub total_count: usize,
}

/// Roster entry for the dashboard: a patient plus the latest device state.
#[derive(Debug, Serialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub device_id: String,
    pub status: String,
    pub last_reading: Option<DateTime<Utc>>,
    pub heart_rate: Option<i32>,
    pub temperature: Option<f64>,
    pub vital_status: Option<String>,
    pub total_readings: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub user_type: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub user_type: String,
}

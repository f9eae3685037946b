use crate::errors::Result;
use crate::metrics::DB_FAILURES_TOTAL;
use crate::model::{Alert, DeviceStatus, Reading, ReadingStatistics, User};
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

pub async fn make_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Persists a classified reading, its alerts, and the device upsert in one
/// transaction, so the stored alerts always reflect the reading they were
/// computed from. Transient database failures are retried with backoff.
pub async fn persist_reading(pool: &PgPool, reading: &Reading, alerts: &[Alert]) -> Result<()> {
    let mut attempts = 0;
    let max_attempts = 5;

    loop {
        attempts += 1;
        match persist_reading_inner(pool, reading, alerts).await {
            Ok(()) => return Ok(()),
            Err(e) => match &e {
                crate::errors::Error::Database(db_err) => {
                    if attempts >= max_attempts || !is_transient_error(db_err) {
                        error!(
                            "Reading insert failed permanently after {} attempts: {}",
                            attempts, e
                        );
                        return Err(e);
                    }

                    let wait_ms = 100 * 2_u64.pow(attempts - 1).min(32);
                    warn!(
                        "Reading insert failed (attempt {}/{}), retrying in {}ms: {}",
                        attempts, max_attempts, wait_ms, db_err
                    );
                    DB_FAILURES_TOTAL.inc();
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                }
                _ => {
                    error!("Reading insert failed with non-database error: {}", e);
                    return Err(e);
                }
            },
        }
    }
}

async fn persist_reading_inner(pool: &PgPool, reading: &Reading, alerts: &[Alert]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO readings (id, device_id, patient_id, heart_rate, temperature, status, ts)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(reading.id)
    .bind(&reading.device_id)
    .bind(&reading.patient_id)
    .bind(reading.heart_rate)
    .bind(reading.temperature)
    .bind(&reading.status)
    .bind(reading.timestamp)
    .execute(&mut *tx)
    .await?;

    for alert in alerts {
        sqlx::query(
            r#"
            INSERT INTO alerts (id, patient_id, device_id, alert_type, message, value, severity, ts, resolved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(alert.id)
        .bind(&alert.patient_id)
        .bind(&alert.device_id)
        .bind(&alert.alert_type)
        .bind(&alert.message)
        .bind(alert.value)
        .bind(&alert.severity)
        .bind(alert.timestamp)
        .bind(alert.resolved)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO devices (device_id, patient_id, status, last_reading, total_readings)
        VALUES ($1, $2, 'active', $3, 1)
        ON CONFLICT (device_id) DO UPDATE
        SET patient_id = EXCLUDED.patient_id,
            status = EXCLUDED.status,
            last_reading = EXCLUDED.last_reading,
            total_readings = devices.total_readings + 1
        "#,
    )
    .bind(&reading.device_id)
    .bind(&reading.patient_id)
    .bind(reading.timestamp)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn recent_readings(pool: &PgPool, limit: i64) -> Result<Vec<Reading>> {
    let readings = sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, device_id, patient_id, heart_rate, temperature, status, ts AS timestamp
        FROM readings
        ORDER BY ts DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(readings)
}

pub async fn device_readings(pool: &PgPool, device_id: &str, limit: i64) -> Result<Vec<Reading>> {
    let readings = sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, device_id, patient_id, heart_rate, temperature, status, ts AS timestamp
        FROM readings
        WHERE device_id = $1
        ORDER BY ts DESC
        LIMIT $2
        "#,
    )
    .bind(device_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(readings)
}

pub async fn patient_readings(pool: &PgPool, patient_id: &str, limit: i64) -> Result<Vec<Reading>> {
    let readings = sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, device_id, patient_id, heart_rate, temperature, status, ts AS timestamp
        FROM readings
        WHERE patient_id = $1
        ORDER BY ts DESC
        LIMIT $2
        "#,
    )
    .bind(patient_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(readings)
}

pub async fn last_device_reading(pool: &PgPool, device_id: &str) -> Result<Option<Reading>> {
    let reading = sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, device_id, patient_id, heart_rate, temperature, status, ts AS timestamp
        FROM readings
        WHERE device_id = $1
        ORDER BY ts DESC
        LIMIT 1
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(reading)
}

pub async fn device_statistics(pool: &PgPool, device_id: &str) -> Result<ReadingStatistics> {
    let stats = sqlx::query_as::<_, ReadingStatistics>(
        r#"
        SELECT AVG(heart_rate)::float8 AS avg_heart_rate,
               AVG(temperature)::float8 AS avg_temperature,
               MIN(heart_rate) AS min_heart_rate,
               MAX(heart_rate) AS max_heart_rate,
               MIN(temperature) AS min_temperature,
               MAX(temperature) AS max_temperature,
               COUNT(*) AS total_readings
        FROM readings
        WHERE device_id = $1
        "#,
    )
    .bind(device_id)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

pub async fn patient_alerts(pool: &PgPool, patient_id: &str, limit: i64) -> Result<Vec<Alert>> {
    let alerts = sqlx::query_as::<_, Alert>(
        r#"
        SELECT id, patient_id, device_id, alert_type, message, value, severity, ts AS timestamp, resolved
        FROM alerts
        WHERE patient_id = $1
        ORDER BY ts DESC
        LIMIT $2
        "#,
    )
    .bind(patient_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(alerts)
}

pub async fn list_devices(pool: &PgPool) -> Result<Vec<DeviceStatus>> {
    let devices = sqlx::query_as::<_, DeviceStatus>(
        r#"
        SELECT device_id, patient_id, status, last_reading, total_readings
        FROM devices
        ORDER BY device_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(devices)
}

pub async fn find_device(pool: &PgPool, device_id: &str) -> Result<Option<DeviceStatus>> {
    let device = sqlx::query_as::<_, DeviceStatus>(
        r#"
        SELECT device_id, patient_id, status, last_reading, total_readings
        FROM devices
        WHERE device_id = $1
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(device)
}

pub async fn create_patient(pool: &PgPool, name: &str, device_id: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, name, user_type, device_id, created_at)
        VALUES ($1, $2, 'patient', $3, $4)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(device_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn create_doctor(pool: &PgPool, name: &str, email: &str, password: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, name, user_type, email, password, created_at)
        VALUES ($1, $2, 'doctor', $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(password)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn find_patient_by_device(pool: &PgPool, device_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, user_type, email, device_id, created_at
        FROM users
        WHERE device_id = $1 AND user_type = 'patient'
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, user_type, email, device_id, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_doctor(pool: &PgPool, email: &str, password: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, user_type, email, device_id, created_at
        FROM users
        WHERE email = $1 AND password = $2 AND user_type = 'doctor'
        "#,
    )
    .bind(email)
    .bind(password)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn list_patients(pool: &PgPool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, user_type, email, device_id, created_at
        FROM users
        WHERE user_type = 'patient'
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => {
            // Connection-related SQLSTATE classes only
            db_err.code().is_some_and(|code| {
                code == "08000" || // connection_exception
                code == "08003" || // connection_does_not_exist
                code == "08006" || // connection_failure
                code == "57P03" || // cannot_connect_now
                code == "53300" // too_many_connections
            })
        }
        _ => false,
    }
}

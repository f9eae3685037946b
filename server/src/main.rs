mod config;
mod db;
mod errors;
mod liveness;
mod metrics;
mod model;
mod rest;
mod validate;
mod vitals;

use axum::{routing::get, Router};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = config::Config::from_env();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting BioConnect server");
    info!("HTTP server: {}", config.http_addr);
    info!(
        "Database: {}",
        config.database_url.split('@').last().unwrap_or("***")
    );
    info!(
        "Thresholds: hr_high={}, hr_low={}, temp_high={}",
        config.thresholds.heart_rate_high,
        config.thresholds.heart_rate_low,
        config.thresholds.temperature_high
    );
    info!("Liveness window: {}s", config.liveness_window_secs);

    // Initialize metrics
    metrics::init_metrics();

    // Connect to database
    let pool = match db::make_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    // Build HTTP app with REST API and metrics endpoint
    let http_addr = config.http_addr.clone();
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(pool, config));

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

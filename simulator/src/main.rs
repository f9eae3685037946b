mod reading;

use clap::Parser;
use reading::ReadingPayload;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(about = "BioConnect device simulator: pushes vitals to the ingest API")]
struct Args {
    /// Base URL of the BioConnect server
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:8080")]
    server_url: String,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 5)]
    devices: usize,

    /// Seconds between pushes per device
    #[arg(long, env = "INTERVAL_SECS", default_value_t = 5)]
    interval_secs: u64,

    /// Register a patient account for each device before pushing
    #[arg(long, env = "REGISTER", default_value_t = false)]
    register: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting BioConnect simulator");
    info!(
        "Server: {}, devices: {}, interval: {}s",
        args.server_url, args.devices, args.interval_secs
    );

    let client = reqwest::Client::new();
    let device_ids: Vec<String> = (1..=args.devices)
        .map(|i| format!("ESP32_{:03}", i))
        .collect();

    if args.register {
        register_devices(&client, &args.server_url, &device_ids).await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));

    loop {
        ticker.tick().await;

        for device_id in &device_ids {
            let payload = ReadingPayload::random(device_id.clone());
            let url = format!("{}/api/v1/esp32/data", args.server_url);

            match client.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let vital_status = resp
                        .json::<serde_json::Value>()
                        .await
                        .ok()
                        .and_then(|v| v.get("vital_status").and_then(|s| s.as_str().map(String::from)))
                        .unwrap_or_else(|| "unknown".to_string());
                    info!(
                        "{}: hr={} temp={:.1} -> {}",
                        payload.device_id, payload.heart_rate, payload.temperature, vital_status
                    );
                }
                Ok(resp) => {
                    warn!("{}: server returned {}", payload.device_id, resp.status());
                }
                Err(e) => {
                    error!("{}: push failed: {}", payload.device_id, e);
                }
            }
        }
    }
}

async fn register_devices(client: &reqwest::Client, server_url: &str, device_ids: &[String]) {
    for device_id in device_ids {
        let body = serde_json::json!({
            "name": format!("Simulated Patient {}", device_id),
            "email": device_id,
            "password": "",
            "user_type": "patient",
        });

        let url = format!("{}/api/v1/register", server_url);
        match client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Registered patient for {}", device_id);
            }
            Ok(resp) => {
                // Already registered from a previous run is fine
                warn!("Register {} returned {}", device_id, resp.status());
            }
            Err(e) => {
                error!("Register {} failed: {}", device_id, e);
            }
        }
    }
}

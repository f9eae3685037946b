use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

const BASE_URL: &str = "http://localhost:8080";

fn device_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("SMOKE_{:06}", rng.gen_range(0..1_000_000))
}

#[tokio::test]
#[ignore]
async fn test_ingest_and_query_flow() {
    println!("\n🚀 Smoke test against {}", BASE_URL);

    let client = reqwest::Client::new();
    let device = device_id();

    // Server must be up
    let health: Value = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("server not reachable")
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    println!("✅ Server healthy");

    // Register a patient for the device
    let resp = client
        .post(format!("{}/api/v1/register", BASE_URL))
        .json(&json!({
            "name": "Smoke Test Patient",
            "email": device,
            "password": "",
            "user_type": "patient",
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    println!("✅ Registered patient for {}", device);

    // Normal reading: no alerts, status normal
    let resp = client
        .post(format!("{}/api/v1/esp32/data", BASE_URL))
        .json(&json!({ "device_id": device, "heart_rate": 72, "temperature": 36.5 }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["vital_status"], "normal");
    println!("✅ Normal reading accepted");

    // Abnormal reading: two alerts, status critical
    let resp = client
        .post(format!("{}/api/v1/readings", BASE_URL))
        .json(&json!({ "device_id": device, "heart_rate": 145, "temperature": 38.9 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["alerts_count"], 2);
    println!("✅ Abnormal reading produced {} alerts", body["alerts_count"]);

    // Out-of-range reading is rejected at the boundary
    let resp = client
        .post(format!("{}/api/v1/readings", BASE_URL))
        .json(&json!({ "device_id": device, "heart_rate": 10, "temperature": 36.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    println!("✅ Invalid reading rejected");

    sleep(Duration::from_millis(200)).await;

    // Device just reported, so liveness must say online
    let status: Value = client
        .get(format!("{}/api/v1/devices/{}/status", BASE_URL, device))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "online");
    assert_eq!(status["total_readings"], 2);
    println!("✅ Device reported online with 2 readings");

    let esp32: Value = client
        .get(format!("{}/api/v1/esp32/status/{}", BASE_URL, device))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(esp32["status"], "online");
    assert_eq!(esp32["vital_status"], "critical");
    println!("✅ ESP32 status reflects last reading");

    // Per-device readings and statistics
    let readings: Value = client
        .get(format!("{}/api/v1/readings/device/{}", BASE_URL, device))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(readings["total_count"], 2);
    assert_eq!(readings["statistics"]["total_readings"], 2);
    assert_eq!(readings["statistics"]["max_heart_rate"], 145);
    println!("✅ Readings and statistics match");

    // Alerts recorded for the patient
    let alerts: Value = client
        .get(format!("{}/api/v1/readings/patient/{}/alerts", BASE_URL, device))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alerts["total_count"], 2);
    println!("✅ Alerts persisted");

    // Patient roster includes the device, online
    let patients: Value = client
        .get(format!("{}/api/v1/patients", BASE_URL))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry = patients["patients"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["device_id"] == device.as_str())
        .expect("patient missing from roster");
    assert_eq!(entry["status"], "online");
    assert_eq!(entry["vital_status"], "critical");
    println!("✅ Patient roster up to date");

    // Unknown device has no liveness to derive
    let resp = client
        .get(format!("{}/api/v1/devices/NOSUCHDEVICE/status", BASE_URL))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let esp32: Value = client
        .get(format!("{}/api/v1/esp32/status/NOSUCHDEVICE", BASE_URL))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(esp32["status"], "offline");
    println!("✅ Unknown devices report offline/not found");

    println!("\n🎉 Smoke test complete");
}

#[tokio::test]
#[ignore]
async fn test_login_round_trip() {
    let client = reqwest::Client::new();
    let device = device_id();

    let resp = client
        .post(format!("{}/api/v1/register", BASE_URL))
        .json(&json!({
            "name": "Login Test Patient",
            "email": device,
            "password": "",
            "user_type": "patient",
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = client
        .post(format!("{}/api/v1/login", BASE_URL))
        .json(&json!({ "email": device, "password": "", "user_type": "patient" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["user"]["type"], "patient");

    let resp = client
        .post(format!("{}/api/v1/login", BASE_URL))
        .json(&json!({ "email": "UNKNOWN_DEVICE", "password": "", "user_type": "patient" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

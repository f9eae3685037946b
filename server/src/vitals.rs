use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Thresholds;

// Status bands used by the device-facing classification. These match what
// the ESP32 firmware displays and are not configurable at runtime.
const NORMAL_HR_MIN: i32 = 60;
const NORMAL_HR_MAX: i32 = 100;
const NORMAL_TEMP_MIN: f64 = 35.0;
const NORMAL_TEMP_MAX: f64 = 37.5;
const CRITICAL_HR_MIN: i32 = 50;
const CRITICAL_HR_MAX: i32 = 120;
const CRITICAL_TEMP_MIN: f64 = 34.0;
const CRITICAL_TEMP_MAX: f64 = 38.5;

/// Severity attached to a threshold alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Which threshold a reading crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HeartRateHigh,
    HeartRateLow,
    TemperatureHigh,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HeartRateHigh => "heart_rate_high",
            AlertKind::HeartRateLow => "heart_rate_low",
            AlertKind::TemperatureHigh => "temperature_high",
        }
    }
}

/// Single label reported back to the device and stored on each reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VitalStatus {
    Normal,
    Elevated,
    Critical,
}

impl VitalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalStatus::Normal => "normal",
            VitalStatus::Elevated => "elevated",
            VitalStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for VitalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One threshold crossing detected in a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalAlert {
    pub alert_type: AlertKind,
    pub message: String,
    pub value: f64,
    pub severity: Severity,
}

/// Alert-list policy: evaluates a reading against the configured thresholds
/// and returns one alert per crossed threshold, heart rate first.
///
/// Heart-rate high and low are mutually exclusive. Temperature is checked
/// against the high threshold only. Out-of-range values are classified like
/// any other value; rejecting them is the caller's concern.
pub fn assess(heart_rate: i32, temperature: f64, thresholds: &Thresholds) -> Vec<VitalAlert> {
    let mut alerts = Vec::new();

    if heart_rate > thresholds.heart_rate_high {
        alerts.push(VitalAlert {
            alert_type: AlertKind::HeartRateHigh,
            message: format!("Heart rate elevated: {} bpm", heart_rate),
            value: heart_rate as f64,
            severity: Severity::High,
        });
    } else if heart_rate < thresholds.heart_rate_low {
        alerts.push(VitalAlert {
            alert_type: AlertKind::HeartRateLow,
            message: format!("Heart rate low: {} bpm", heart_rate),
            value: heart_rate as f64,
            severity: Severity::Medium,
        });
    }

    if temperature > thresholds.temperature_high {
        alerts.push(VitalAlert {
            alert_type: AlertKind::TemperatureHigh,
            message: format!("Temperature elevated: {:.1}°C", temperature),
            value: temperature,
            severity: Severity::Medium,
        });
    }

    alerts
}

/// Flat message list in the order the alerts were generated.
pub fn alert_messages(alerts: &[VitalAlert]) -> Vec<String> {
    alerts.iter().map(|a| a.message.clone()).collect()
}

/// Single-label policy: maps a reading to the status string shown on the
/// device. Critical supersedes elevated supersedes normal, so the critical
/// bands are checked first and can never be masked.
///
/// Independent from [`assess`]: the two classifications use different bands
/// and are consumed by different surfaces.
pub fn classify_status(heart_rate: i32, temperature: f64) -> VitalStatus {
    if heart_rate < CRITICAL_HR_MIN
        || heart_rate > CRITICAL_HR_MAX
        || temperature < CRITICAL_TEMP_MIN
        || temperature > CRITICAL_TEMP_MAX
    {
        return VitalStatus::Critical;
    }

    if heart_rate < NORMAL_HR_MIN
        || heart_rate > NORMAL_HR_MAX
        || temperature < NORMAL_TEMP_MIN
        || temperature > NORMAL_TEMP_MAX
    {
        return VitalStatus::Elevated;
    }

    VitalStatus::Normal
}

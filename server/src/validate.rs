use crate::errors::{Error, Result};
use crate::model::ReadingCreate;

const HEART_RATE_MIN: i32 = 30;
const HEART_RATE_MAX: i32 = 200;
const TEMP_MIN: f64 = 30.0;
const TEMP_MAX: f64 = 45.0;
const DEVICE_ID_MAX_LEN: usize = 50;

/// Validates an ingest request before it reaches the classifier. The
/// classifier itself is total over all numeric inputs; these bounds reject
/// readings that cannot come from a working sensor.
pub fn validate(reading: &ReadingCreate) -> Result<()> {
    if reading.device_id.is_empty() {
        return Err(Error::Validation("Device ID cannot be empty".to_string()));
    }

    if reading.device_id.len() > DEVICE_ID_MAX_LEN {
        return Err(Error::Validation(format!(
            "Device ID exceeds {} characters",
            DEVICE_ID_MAX_LEN
        )));
    }

    if reading.heart_rate < HEART_RATE_MIN || reading.heart_rate > HEART_RATE_MAX {
        return Err(Error::Validation(format!(
            "Heart rate {} out of range [{}, {}]",
            reading.heart_rate, HEART_RATE_MIN, HEART_RATE_MAX
        )));
    }

    if reading.temperature < TEMP_MIN || reading.temperature > TEMP_MAX {
        return Err(Error::Validation(format!(
            "Temperature {} out of range [{}, {}]",
            reading.temperature, TEMP_MIN, TEMP_MAX
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReadingCreate {
        ReadingCreate {
            device_id: "ESP32_001".to_string(),
            heart_rate: 72,
            temperature: 36.5,
        }
    }

    #[test]
    fn test_valid_reading() {
        assert!(validate(&sample()).is_ok());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut reading = sample();
        reading.heart_rate = 30;
        reading.temperature = 30.0;
        assert!(validate(&reading).is_ok());

        reading.heart_rate = 200;
        reading.temperature = 45.0;
        assert!(validate(&reading).is_ok());
    }

    #[test]
    fn test_invalid_heart_rate() {
        let mut reading = sample();
        reading.heart_rate = 29;
        assert!(validate(&reading).is_err());

        reading.heart_rate = 201;
        assert!(validate(&reading).is_err());
    }

    #[test]
    fn test_invalid_temperature() {
        let mut reading = sample();
        reading.temperature = 29.9;
        assert!(validate(&reading).is_err());

        reading.temperature = 45.1;
        assert!(validate(&reading).is_err());
    }

    #[test]
    fn test_empty_device_id() {
        let mut reading = sample();
        reading.device_id = String::new();
        assert!(validate(&reading).is_err());
    }

    #[test]
    fn test_oversized_device_id() {
        let mut reading = sample();
        reading.device_id = "x".repeat(DEVICE_ID_MAX_LEN + 1);
        assert!(validate(&reading).is_err());
    }
}

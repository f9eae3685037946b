use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ReadingPayload {
    pub device_id: String,
    pub heart_rate: i32,
    pub temperature: f64,
}

impl ReadingPayload {
    /// Mostly resting vitals, with occasional abnormal excursions so the
    /// alerting path gets exercised.
    pub fn random(device_id: String) -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        let (heart_rate, temperature) = if rng.gen_bool(0.1) {
            (rng.gen_range(121..=180), rng.gen_range(37.6..40.0))
        } else if rng.gen_bool(0.05) {
            (rng.gen_range(35..50), rng.gen_range(34.5..36.0))
        } else {
            (rng.gen_range(60..=100), rng.gen_range(35.5..37.4))
        };

        Self {
            device_id,
            heart_rate,
            temperature,
        }
    }
}

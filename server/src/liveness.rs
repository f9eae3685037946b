use chrono::{DateTime, Utc};

/// Default liveness window: a device that has been silent for five minutes
/// is reported offline.
pub const DEFAULT_WINDOW_SECS: i64 = 300;

/// A device is online iff its last contact lies strictly inside the window.
///
/// The comparison keeps millisecond precision; a device last seen exactly
/// `window_secs` ago is offline. A `last_seen` ahead of `now` (device or
/// server clock skew) counts as contact within the window: the device has
/// reported more recently than `now`, so it is online by construction.
///
/// Callers must not invoke this for a device with no readings at all; with
/// no contact on record there is nothing to compare, and such devices are
/// reported offline at the boundary.
pub fn is_online(last_seen: DateTime<Utc>, now: DateTime<Utc>, window_secs: i64) -> bool {
    let elapsed_ms = now.signed_duration_since(last_seen).num_milliseconds();
    elapsed_ms < window_secs * 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn recent_contact_is_online() {
        let t = now();
        assert!(is_online(t - Duration::seconds(1), t, DEFAULT_WINDOW_SECS));
        assert!(is_online(t - Duration::seconds(299), t, DEFAULT_WINDOW_SECS));
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let t = now();
        assert!(!is_online(t - Duration::seconds(300), t, DEFAULT_WINDOW_SECS));
        assert!(!is_online(t - Duration::seconds(301), t, DEFAULT_WINDOW_SECS));
    }

    #[test]
    fn sub_second_precision_is_kept() {
        let t = now();
        assert!(is_online(
            t - Duration::milliseconds(299_999),
            t,
            DEFAULT_WINDOW_SECS
        ));
        assert!(!is_online(
            t - Duration::milliseconds(300_000),
            t,
            DEFAULT_WINDOW_SECS
        ));
    }

    #[test]
    fn clock_skew_counts_as_contact() {
        let t = now();
        assert!(is_online(t + Duration::seconds(5), t, DEFAULT_WINDOW_SECS));
        assert!(is_online(t + Duration::milliseconds(1), t, DEFAULT_WINDOW_SECS));
    }

    #[test]
    fn window_is_configurable() {
        let t = now();
        assert!(is_online(t - Duration::seconds(50), t, 60));
        assert!(!is_online(t - Duration::seconds(60), t, 60));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let t = now();
        let seen = t - Duration::seconds(150);
        assert_eq!(
            is_online(seen, t, DEFAULT_WINDOW_SECS),
            is_online(seen, t, DEFAULT_WINDOW_SECS)
        );
    }
}

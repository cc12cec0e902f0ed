use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::models::SensorReading;

/// Readings this many seconds old or older are considered stale.
pub const FRESHNESS_THRESHOLD_SECS: i64 = 600;

pub fn freshness_threshold() -> Duration {
    Duration::seconds(FRESHNESS_THRESHOLD_SECS)
}

/// Returns whether `reading` was last seen less than
/// [`FRESHNESS_THRESHOLD_SECS`] before `now`.
///
/// A missing reading, or a missing or zero `last_seen`, is never fresh. A
/// `last_seen` in the future has a negative age and counts as fresh.
pub fn is_fresh(reading: Option<&SensorReading>, now: DateTime<Utc>) -> bool {
    let Some(reading) = reading else {
        warn!("No data received, cannot determine freshness");
        return false;
    };

    let last_seen = match reading.last_seen {
        Some(last_seen) if last_seen != 0 => last_seen,
        _ => {
            warn!(
                "Sensor {}: data missing 'last_seen' timestamp, cannot determine freshness",
                reading.sensor_index
            );
            return false;
        }
    };

    let Some(last_seen) = DateTime::from_timestamp(last_seen, 0) else {
        warn!(
            "Sensor {}: 'last_seen' {} is not a valid timestamp",
            reading.sensor_index, last_seen
        );
        return false;
    };

    let threshold = freshness_threshold();
    let age = now - last_seen;
    if age < threshold {
        info!(
            "Freshness check passed. Last seen {}s ago (< {} minute threshold)",
            age.num_seconds(),
            threshold.num_minutes()
        );
        true
    } else {
        warn!(
            "Data is stale. Last seen {}s ago (>= {} minute threshold)",
            age.num_seconds(),
            threshold.num_minutes()
        );
        false
    }
}

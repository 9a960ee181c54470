//! Duration helpers shared across the workspace.

use chrono::Duration;

const NANOS_PER_HOUR: f64 = 3_600_000_000_000.0;

/// Fractional hours in `d`.
pub fn as_hours(d: Duration) -> f64 {
    match d.num_nanoseconds() {
        Some(nanos) => nanos as f64 / NANOS_PER_HOUR,
        None => d.num_seconds() as f64 / 3600.0,
    }
}

/// A duration of `hours` fractional hours, rounded to the nearest nanosecond.
pub fn from_hours(hours: f64) -> Duration {
    Duration::nanoseconds((hours * NANOS_PER_HOUR).round() as i64)
}

/// Serde adapter storing a duration as integer nanoseconds.
pub mod serde_nanos {
    use chrono::Duration;
    use serde::{de::Deserialize, ser::Error, Deserializer, Serializer};

    /// Serialize `d` as nanoseconds.
    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = d
            .num_nanoseconds()
            .ok_or_else(|| S::Error::custom("duration does not fit in i64 nanoseconds"))?;
        serializer.serialize_i64(nanos)
    }

    /// Deserialize nanoseconds into a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::nanoseconds(i64::deserialize(deserializer)?))
    }
}

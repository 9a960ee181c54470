//! Parsing of user-typed durations such as `1.5h`, `90m` or `0.5d`.

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use est_core::duration::from_hours;
use regex::Regex;

/// Working hours in one estimated day.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Working days in one estimated week.
pub const DAYS_PER_WEEK: f64 = 5.0;

const NUMBER: &str = r"([1-9][0-9]*(\.[0-9]*)?|0\.[0-9]+)";

/// Parse a logged or elapsed duration: minutes or hours, unit required.
///
/// `what` names the value in the error message, e.g. "log duration".
pub fn parse_duration(s: &str, what: &str) -> Result<Duration> {
    let re = Regex::new(&format!("^{NUMBER}(m|h)$")).context("Failed to compile duration regex")?;
    let caps = re.captures(s.trim()).ok_or_else(|| {
        anyhow!("invalid {what} '{s}'. For example, \"1.5h\", \"0.5h\", or \"90m\"")
    })?;
    to_duration(&caps[1], caps.get(3).map(|m| m.as_str()))
}

/// Parse an estimate: minutes, hours, days of 8 hours or weeks of 5 days.
/// A bare number is hours.
pub fn parse_estimate(s: &str) -> Result<Duration> {
    let re = Regex::new(&format!("^{NUMBER}(m|h|d|w)?$")).context("Failed to compile estimate regex")?;
    let caps = re.captures(s.trim()).ok_or_else(|| {
        anyhow!("invalid estimate '{s}'. For example, \"30m\", \"3.5h\", \"2d\", or \"0.75w\"")
    })?;
    to_duration(&caps[1], caps.get(3).map(|m| m.as_str()))
}

fn to_duration(number: &str, unit: Option<&str>) -> Result<Duration> {
    let value: f64 = number
        .parse()
        .with_context(|| format!("'{number}' is not a number"))?;
    let hours = match unit {
        Some("m") => value / 60.0,
        Some("d") => value * HOURS_PER_DAY,
        Some("w") => value * HOURS_PER_DAY * DAYS_PER_WEEK,
        _ => value,
    };
    Ok(from_hours(hours))
}

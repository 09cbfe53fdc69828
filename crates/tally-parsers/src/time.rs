//! Time parsing utilities for accounting records.

use chrono::{DateTime, Local};

/// Parse a `HH:MM:SS` usage time (e.g. `resources_used.walltime`) to seconds.
///
/// Hours are not bounded by 24. Anything other than exactly three
/// colon-separated unsigned integers returns None, as does a total that
/// overflows `u64`.
pub fn parse_hms_secs(s: &str) -> Option<u64> {
    let mut parts = s.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let mins: u64 = parts.next()?.parse().ok()?;
    let secs: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    hours
        .checked_mul(3600)?
        .checked_add(mins.checked_mul(60)?)?
        .checked_add(secs)
}

/// Parse an epoch-seconds timestamp (`ctime`, `qtime`, `start`, ...).
pub fn parse_epoch(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

/// Convert seconds to fractional hours.
pub fn secs_to_hours(secs: f64) -> f64 {
    secs / 3600.0
}

/// Format an epoch timestamp in local time, ctime style
/// (e.g. "Wed Jan  1 00:00:00 2014").
pub fn format_epoch(ts: i64) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%a %b %e %H:%M:%S %Y")
            .to_string(),
        None => ts.to_string(),
    }
}

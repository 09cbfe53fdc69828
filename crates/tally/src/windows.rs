//! Standard reporting windows: trailing 30/60/90 days and calendar years.

use chrono::{DateTime, Datelike, Local, TimeZone};
use tally_stats::Window;

/// Widths of the trailing windows, in days.
pub const TRAILING_DAYS: [i64; 3] = [30, 60, 90];

/// The current local year at `now` and the two before it, newest first.
pub fn default_years(now: i64) -> Vec<i32> {
    let year = DateTime::from_timestamp(now, 0)
        .map(|dt| dt.with_timezone(&Local).year())
        .unwrap_or(1970);
    vec![year, year - 1, year - 2]
}

/// Jan 1 00:00:00 local time of `year` up to the same instant of the next year.
pub fn calendar_year(year: i32) -> Option<Window> {
    let start = Local.with_ymd_and_hms(year, 1, 1, 0, 0, 0).earliest()?;
    let end = Local.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).earliest()?;
    Some(Window::new(
        year.to_string(),
        start.timestamp(),
        end.timestamp(),
    ))
}

/// Trailing windows ending at `now`, then one window per year.
///
/// Returns None if a year has no representable start.
pub fn standard_windows(now: i64, years: &[i32]) -> Option<Vec<Window>> {
    let mut windows: Vec<Window> = TRAILING_DAYS
        .iter()
        .map(|days| Window::trailing(format!("Past {} days", days), now, *days))
        .collect();
    for year in years {
        windows.push(calendar_year(*year)?);
    }
    Some(windows)
}

//! Reporting windows.

use serde::Serialize;

pub const SECS_PER_DAY: i64 = 86_400;

/// A half-open `[start, end)` epoch interval with a display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub label: String,
    pub start: i64,
    pub end: i64,
}

impl Window {
    pub fn new(label: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// The `days` days ending at `now`. The start saturates at `i64::MIN`.
    pub fn trailing(label: impl Into<String>, now: i64, days: i64) -> Self {
        let start = now.saturating_sub(days.saturating_mul(SECS_PER_DAY));
        Self::new(label, start, now)
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Whole days covered.
    pub fn days(&self) -> i64 {
        self.end.saturating_sub(self.start) / SECS_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let w = Window::new("w", 100, 200);
        assert!(w.contains(100));
        assert!(w.contains(199));
        assert!(!w.contains(200));
        assert!(!w.contains(99));
    }

    #[test]
    fn test_trailing() {
        let w = Window::trailing("Past 30 days", 10 * SECS_PER_DAY + 5, 30);
        assert_eq!(w.end, 10 * SECS_PER_DAY + 5);
        assert_eq!(w.start, -20 * SECS_PER_DAY + 5);
        assert_eq!(w.days(), 30);
    }

    #[test]
    fn test_trailing_saturates() {
        let w = Window::trailing("Past 90 days", i64::MIN + 5, 90);
        assert_eq!(w.start, i64::MIN);
        assert_eq!(w.end, i64::MIN + 5);
        assert_eq!(w.days(), 0);

        let w = Window::trailing("forever", i64::MAX, i64::MAX);
        assert_eq!(w.start, 0);
        assert_eq!(w.days(), i64::MAX / SECS_PER_DAY);
        assert!(w.contains(0));
    }
}

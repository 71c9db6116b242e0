use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Sentinel for an interval without a lower bound.
pub const INFINITE_START: i64 = i64::MIN;

/// Sentinel for an interval without an upper bound.
pub const INFINITE_END: i64 = i64::MAX;

/// Half-open time interval `[start, end)` in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Result<Interval> {
        if start > end {
            return Err(Error::InvalidInterval { start, end });
        }
        Ok(Interval { start, end })
    }

    /// Interval covering the whole time axis.
    pub fn infinite() -> Interval {
        Interval { start: INFINITE_START, end: INFINITE_END }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_longer_than(&self, duration: i64) -> bool {
        self.duration() > duration
    }

    /// Empty intervals overlap nothing.
    pub fn overlaps(&self, other: &Interval) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies completely inside of this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_time(&self, time: i64) -> bool {
        self.start <= time && time < self.end
    }

    /// Whether the whole interval lies before `time`.
    pub fn is_before(&self, time: i64) -> bool {
        self.end <= time
    }

    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Interval { start: self.start.max(other.start), end: self.end.min(other.end) })
    }

    pub fn with_start(&self, start: i64) -> Interval {
        Interval { start, end: self.end.max(start) }
    }

    pub fn with_end(&self, end: i64) -> Interval {
        Interval { start: self.start.min(end), end }
    }

    /// Extends the interval by the given margins, saturating at the infinity sentinels.
    pub fn extend(&self, before: i64, after: i64) -> Interval {
        let start = if self.start == INFINITE_START { INFINITE_START } else { self.start.saturating_sub(before) };
        let end = if self.end == INFINITE_END { INFINITE_END } else { self.end.saturating_add(after) };
        Interval { start, end }
    }
}

/// Formats a millisecond timestamp for reports and logs.
pub fn format_time(time: i64) -> String {
    match time {
        INFINITE_START => "-infinity".to_string(),
        INFINITE_END => "infinity".to_string(),
        _ => match DateTime::from_timestamp_millis(time) {
            Some(date_time) => date_time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            None => time.to_string(),
        },
    }
}

/// Formats a duration in milliseconds as `HH:MM:SS`.
pub fn format_duration(duration: i64) -> String {
    let seconds = duration / 1000;
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", format_time(self.start), format_time(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open_overlap() {
        let first = Interval::new(0, 10).unwrap();
        let second = Interval::new(10, 20).unwrap();
        let third = Interval::new(9, 11).unwrap();

        assert!(!first.overlaps(&second), "Touching intervals must not overlap");
        assert!(first.overlaps(&third));
        assert!(second.overlaps(&third));
    }

    #[test]
    fn test_empty_interval_overlaps_nothing() {
        let empty = Interval::new(50, 50).unwrap();
        let around = Interval::new(0, 100).unwrap();

        assert!(!empty.overlaps(&around));
        assert!(!around.overlaps(&empty));
        assert!(!empty.overlaps(&empty));
        assert_eq!(around.intersection(&empty), None);
    }

    #[test]
    fn test_contains_and_intersection() {
        let outer = Interval::new(0, 100).unwrap();
        let inner = Interval::new(20, 30).unwrap();

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert_eq!(outer.intersection(&Interval::new(90, 120).unwrap()), Some(Interval { start: 90, end: 100 }));
        assert_eq!(outer.intersection(&Interval::new(100, 120).unwrap()), None);
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        assert!(Interval::new(5, 4).is_err());
        assert!(Interval::new(5, 5).unwrap().is_empty());
    }

    #[test]
    fn test_infinite_interval() {
        let infinite = Interval::infinite();
        assert!(infinite.contains(&Interval::new(-1000, 1000).unwrap()));
        assert_eq!(infinite.extend(10, 10), infinite, "Infinite bounds must stay infinite");
        assert_eq!(format_time(INFINITE_END), "infinity");
    }
}

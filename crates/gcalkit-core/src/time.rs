//! Time helpers for Calendar API queries.
//!
//! Google's `timeMin`/`timeMax` parameters take RFC 3339 timestamps. The
//! API is strict about the offset, so everything here is normalized to UTC
//! and rendered with a literal `Z`.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Format string for Calendar API timestamps (`yyyy-MM-ddTHH:mm:ssZ`).
pub const GOOGLE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Formats a datetime in any timezone the way the Calendar API expects.
///
/// Sub-second precision is dropped.
pub fn format_google_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc)
        .format(GOOGLE_DATETIME_FORMAT)
        .to_string()
}

/// A half-open time range `[start, end)` used to bound event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// Returns `None` if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Creates a time window from a start time and a non-negative duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Option<Self> {
        Self::new(start, start + duration)
    }

    /// Creates a window covering one calendar day in the given timezone.
    ///
    /// Returns `None` when local midnight is ambiguous or skipped (DST
    /// transitions in a few zones).
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<Self> {
        let start = tz
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .single()?
            .with_timezone(&Utc);
        let end = tz
            .from_local_datetime(&date.succ_opt()?.and_hms_opt(0, 0, 0)?)
            .single()?
            .with_timezone(&Utc);
        Self::new(start, end)
    }

    /// `timeMin` query value.
    pub fn time_min(&self) -> String {
        format_google_datetime(&self.start)
    }

    /// `timeMax` query value.
    pub fn time_max(&self) -> String {
        format_google_datetime(&self.end)
    }

    /// Returns true if `dt` falls inside the window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        dt >= self.start && dt < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn formats_utc_with_z_suffix() {
        assert_eq!(
            format_google_datetime(&utc(2024, 3, 15, 9, 5, 7)),
            "2024-03-15T09:05:07Z"
        );
    }

    #[test]
    fn formats_offset_datetime_as_utc() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = tz.with_ymd_and_hms(2024, 3, 15, 1, 30, 0).unwrap();
        assert_eq!(format_google_datetime(&local), "2024-03-14T23:30:00Z");
    }

    #[test]
    fn drops_subsecond_precision() {
        let dt = utc(2024, 1, 1, 0, 0, 0) + Duration::milliseconds(999);
        assert_eq!(format_google_datetime(&dt), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn window_rejects_inverted_range() {
        assert!(TimeWindow::new(utc(2024, 1, 2, 0, 0, 0), utc(2024, 1, 1, 0, 0, 0)).is_none());
        assert!(TimeWindow::from_duration(utc(2024, 1, 1, 0, 0, 0), Duration::hours(-1)).is_none());
    }

    #[test]
    fn window_for_date_in_utc() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        let window = TimeWindow::for_date(date, &Utc).unwrap();
        assert_eq!(window.time_min(), "2025-02-05T00:00:00Z");
        assert_eq!(window.time_max(), "2025-02-06T00:00:00Z");
    }

    #[test]
    fn window_contains_is_half_open() {
        let window =
            TimeWindow::from_duration(utc(2025, 2, 5, 10, 0, 0), Duration::hours(2)).unwrap();
        assert!(window.contains(utc(2025, 2, 5, 10, 0, 0)));
        assert!(window.contains(utc(2025, 2, 5, 11, 59, 59)));
        assert!(!window.contains(utc(2025, 2, 5, 12, 0, 0)));
    }
}

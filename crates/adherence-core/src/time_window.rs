//! Calendar-day and time-of-day helpers shared by the calculators.
//!
//! All instants are carried as `DateTime<Utc>`; the caller's local clock is
//! expressed as a `FixedOffset` and only applied when a calendar date or a
//! wall-clock time is needed.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// Largest offset any real time zone uses (UTC+14:00).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Build a `FixedOffset` from minutes east of UTC.
///
/// Returns `None` when the offset is outside ±14 hours.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return None;
    }
    FixedOffset::east_opt(minutes * 60)
}

/// UTC as a `FixedOffset`.
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Calendar date of `ts` on the local clock.
pub fn local_date(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Wall-clock time of `ts` on the local clock.
pub fn local_time(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveTime {
    ts.with_timezone(&offset).time()
}

/// Signed number of calendar days from `earlier` to `later`.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

pub fn is_same_day(a: NaiveDate, b: NaiveDate) -> bool {
    a == b
}

/// True when `later` is exactly the day after `earlier`.
pub fn is_consecutive_day(earlier: NaiveDate, later: NaiveDate) -> bool {
    days_between(earlier, later) == 1
}

/// Whether `time` falls inside the half-open window `[start, end)`.
///
/// When `end < start` the window spans midnight. An empty window
/// (`start == end`) contains nothing.
pub fn window_contains(start: NaiveTime, end: NaiveTime, time: NaiveTime) -> bool {
    if start < end {
        start <= time && time < end
    } else if end < start {
        time >= start || time < end
    } else {
        false
    }
}

/// Next instant strictly after `ts` at which the local clock reads `start`.
pub fn next_window_open(ts: DateTime<Utc>, offset: FixedOffset, start: NaiveTime) -> DateTime<Utc> {
    let local = ts.with_timezone(&offset).naive_local();
    let mut candidate = local.date().and_time(start);
    if candidate <= local {
        candidate += Duration::days(1);
    }
    let utc_naive = candidate - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc_naive)
}

/// Render a duration as `"7h 59m"` for user-facing reasons.
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    match (hours, minutes) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_local_date_respects_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        let plus_two = offset_from_minutes(120).unwrap();
        assert_eq!(local_date(ts, utc_offset()), d(2024, 1, 1));
        assert_eq!(local_date(ts, plus_two), d(2024, 1, 2));
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        assert!(offset_from_minutes(15 * 60).is_none());
        assert!(offset_from_minutes(-14 * 60).is_some());
    }

    #[test]
    fn test_consecutive_and_same_day() {
        assert!(is_consecutive_day(d(2024, 2, 28), d(2024, 2, 29)));
        assert!(is_consecutive_day(d(2023, 12, 31), d(2024, 1, 1)));
        assert!(!is_consecutive_day(d(2024, 1, 1), d(2024, 1, 3)));
        assert!(!is_consecutive_day(d(2024, 1, 2), d(2024, 1, 1)));
        assert!(is_same_day(d(2024, 1, 1), d(2024, 1, 1)));
        assert_eq!(days_between(d(2024, 1, 4), d(2024, 1, 1)), -3);
    }

    #[test]
    fn test_window_contains_regular() {
        assert!(window_contains(t(8, 0), t(20, 0), t(8, 0)));
        assert!(window_contains(t(8, 0), t(20, 0), t(19, 59)));
        assert!(!window_contains(t(8, 0), t(20, 0), t(20, 0)));
        assert!(!window_contains(t(8, 0), t(20, 0), t(7, 59)));
    }

    #[test]
    fn test_window_contains_wraps_midnight() {
        assert!(window_contains(t(22, 0), t(6, 0), t(23, 0)));
        assert!(window_contains(t(22, 0), t(6, 0), t(0, 0)));
        assert!(window_contains(t(22, 0), t(6, 0), t(5, 59)));
        assert!(!window_contains(t(22, 0), t(6, 0), t(6, 0)));
        assert!(!window_contains(t(22, 0), t(6, 0), t(12, 0)));
    }

    #[test]
    fn test_empty_window_contains_nothing() {
        assert!(!window_contains(t(8, 0), t(8, 0), t(8, 0)));
    }

    #[test]
    fn test_next_window_open_same_day() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        let next = next_window_open(ts, utc_offset(), t(8, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_next_window_open_rolls_to_tomorrow() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 0).unwrap();
        let next = next_window_open(ts, utc_offset(), t(8, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_next_window_open_with_offset() {
        // 05:00 UTC is 07:00 at UTC+2, window opens at 08:00 local = 06:00 UTC
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        let offset = offset_from_minutes(120).unwrap();
        let next = next_window_open(ts, offset, t(8, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::minutes(479)), "7h 59m");
        assert_eq!(format_duration(Duration::hours(8)), "8h");
        assert_eq!(format_duration(Duration::minutes(1)), "1m");
        assert_eq!(format_duration(Duration::minutes(-5)), "0m");
    }
}

//! Time axis arithmetic for the day timeline.
//!
//! One hour is four quarter-hour slots, each `scale` pixels tall. Offsets are
//! measured from `start_hour` at the top of the view.

use chrono::{
    DateTime, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, TimeZone, Timelike, Utc,
};

const QUARTERS_PER_HOUR: f64 = 4.0;

/// Longest DST gap searched when a wall time does not exist.
const MAX_GAP_MINUTES: u32 = 180;

/// Scale and visible start of the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    pub start_hour: f64,
    pub scale: f64,
}

impl Default for TimelineLayout {
    fn default() -> Self {
        Self {
            start_hour: 7.0,
            scale: 20.0,
        }
    }
}

/// Hours plus minutes/60, ignoring the date and seconds.
pub fn fractional_hours<T: Timelike>(time: &T) -> f64 {
    f64::from(time.hour()) + f64::from(time.minute()) / 60.0
}

/// Distance from the top of the view. Negative for events before `calendar_start_hour`.
pub fn offset_px<T: Timelike>(start: &T, calendar_start_hour: f64, scale: f64) -> f64 {
    (fractional_hours(start) - calendar_start_hour) * scale * QUARTERS_PER_HOUR
}

/// Event block height, one pixel short of the slot span.
///
/// An event ending on a later day gives a negative height; callers decide what to do.
pub fn height_px<T: Timelike>(start: &T, end: &T, scale: f64) -> f64 {
    (fractional_hours(end) - fractional_hours(start)) * scale * QUARTERS_PER_HOUR - 1.0
}

/// Position of the "now" line.
pub fn current_time_offset<T: Timelike>(now: &T, layout: &TimelineLayout) -> f64 {
    offset_px(now, layout.start_hour, layout.scale)
}

/// 12-hour clock without leading zeros: "12am", "9:05am", "3pm".
pub fn format_clock_time<T: Timelike>(time: &T) -> String {
    let (is_pm, hour) = time.hour12();
    let suffix = if is_pm { "pm" } else { "am" };

    match time.minute() {
        0 => format!("{}{}", hour, suffix),
        minute => format!("{}:{:02}{}", hour, minute, suffix),
    }
}

/// Local midnight through 23:59:59.999 of one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayWindow<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> DayWindow<Tz> {
    /// `timeMin` query value, UTC with millisecond precision
    pub fn time_min(&self) -> String {
        self.start
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// `timeMax` query value
    pub fn time_max(&self) -> String {
        self.end
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }
}

/// The window covering the calendar day `now` falls on, in `now`'s timezone.
pub fn today_window<Tz: TimeZone>(now: &DateTime<Tz>) -> DayWindow<Tz> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    let last_milli = midnight + TimeDelta::days(1) - TimeDelta::milliseconds(1);

    DayWindow {
        start: resolve_local(&tz, midnight, true),
        end: resolve_local(&tz, last_milli, false),
    }
}

/// Local wall time to an instant.
///
/// A wall time inside a DST gap moves to the nearest one that exists: forward
/// for the start of the window, backward for the end.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, earliest: bool) -> DateTime<Tz> {
    let step = if earliest {
        TimeDelta::minutes(1)
    } else {
        TimeDelta::minutes(-1)
    };

    let mut candidate = naive;
    for _ in 0..=MAX_GAP_MINUTES {
        let mapped = tz.from_local_datetime(&candidate);
        let resolved = if earliest {
            mapped.earliest()
        } else {
            mapped.latest()
        };
        if let Some(resolved) = resolved {
            return resolved;
        }
        candidate += step;
    }

    tracing::warn!("No valid local time near {}, reading it as UTC", naive);
    tz.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::{FixedOffset, LocalResult, NaiveDate};

    /// UTC-4 until 2024-09-08T04:00Z, UTC-3 after, so local 00:00-01:00 that day is skipped.
    #[derive(Debug, Clone, Copy)]
    struct MidnightGap;

    impl MidnightGap {
        fn switch() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 9, 8)
                .unwrap()
                .and_hms_opt(4, 0, 0)
                .unwrap()
        }

        fn before() -> FixedOffset {
            FixedOffset::west_opt(4 * 3600).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::west_opt(3 * 3600).unwrap()
        }
    }

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            MidnightGap
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let holds = |offset: FixedOffset| {
                let utc = *local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
                (utc < Self::switch()) == (offset == Self::before())
            };
            match (holds(Self::before()), holds(Self::after())) {
                (true, true) => LocalResult::Ambiguous(Self::before(), Self::after()),
                (true, false) => LocalResult::Single(Self::before()),
                (false, true) => LocalResult::Single(Self::after()),
                (false, false) => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch() {
                Self::before()
            } else {
                Self::after()
            }
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn matches_clock_pattern(s: &str) -> bool {
        let Some(body) = s.strip_suffix("am").or_else(|| s.strip_suffix("pm")) else {
            return false;
        };
        let (hour, minute) = match body.split_once(':') {
            Some((h, m)) => (h, Some(m)),
            None => (body, None),
        };
        let hour_ok = !hour.starts_with('0')
            && hour.parse::<u32>().map(|h| (1..=12).contains(&h)).unwrap_or(false);
        let minute_ok = minute.map_or(true, |m| {
            m.len() == 2 && m.parse::<u32>().map(|v| v < 60).unwrap_or(false)
        });
        hour_ok && minute_ok
    }

    #[test]
    fn test_fractional_hours_ignores_seconds() {
        let t = NaiveTime::from_hms_opt(14, 30, 59).unwrap();
        assert_eq!(fractional_hours(&t), 14.5);
    }

    #[test]
    fn test_offset_and_height() {
        assert_eq!(offset_px(&at(9, 0), 7.0, 20.0), 160.0);
        assert_eq!(offset_px(&at(14, 0), 7.0, 20.0), 560.0);
        assert_eq!(height_px(&at(9, 0), &at(10, 0), 20.0), 79.0);
        assert_eq!(height_px(&at(14, 0), &at(14, 30), 20.0), 39.0);
    }

    #[test]
    fn test_offset_before_visible_window_is_negative() {
        assert_eq!(offset_px(&at(6, 0), 7.0, 20.0), -80.0);
    }

    #[test]
    fn test_height_is_linear_in_duration() {
        let start = at(9, 0);
        let single = height_px(&start, &at(9, 45), 20.0) + 1.0;
        let double = height_px(&start, &at(10, 30), 20.0) + 1.0;
        assert_eq!(double, single * 2.0);

        let near = offset_px(&at(8, 0), 7.0, 20.0);
        let far = offset_px(&at(9, 0), 7.0, 20.0);
        assert_eq!(far, near * 2.0);
    }

    #[test]
    fn test_midnight_crossing_gives_negative_height() {
        assert!(height_px(&at(23, 0), &at(1, 0), 20.0) < 0.0);
    }

    #[test]
    fn test_format_clock_time() {
        assert_eq!(format_clock_time(&at(0, 0)), "12am");
        assert_eq!(format_clock_time(&at(0, 5)), "12:05am");
        assert_eq!(format_clock_time(&at(9, 0)), "9am");
        assert_eq!(format_clock_time(&at(12, 0)), "12pm");
        assert_eq!(format_clock_time(&at(13, 30)), "1:30pm");
        assert_eq!(format_clock_time(&at(23, 59)), "11:59pm");
    }

    #[test]
    fn test_format_clock_time_every_minute() {
        for h in 0..24 {
            for m in 0..60 {
                let label = format_clock_time(&at(h, m));
                assert!(matches_clock_pattern(&label), "bad label {}", label);
                assert_eq!(label.contains(':'), m != 0, "label {}", label);
            }
        }
    }

    #[test]
    fn test_current_time_offset_uses_layout() {
        let layout = TimelineLayout {
            start_hour: 8.0,
            scale: 10.0,
        };
        assert_eq!(current_time_offset(&at(9, 30), &layout), 60.0);
    }

    #[test]
    fn test_today_window_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 15, 42, 7).unwrap();
        let window = today_window(&now);

        assert_eq!(window.time_min(), "2024-02-01T00:00:00.000Z");
        assert_eq!(window.time_max(), "2024-02-01T23:59:59.999Z");
        assert_eq!(window.start.date_naive(), window.end.date_naive());
    }

    #[test]
    fn test_today_window_is_local_to_offset() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 2, 1, 21, 0, 0).unwrap();
        let window = today_window(&now);

        assert_eq!(
            window.start.date_naive(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(window.time_min(), "2024-02-01T05:00:00.000Z");
        assert_eq!(window.time_max(), "2024-02-02T04:59:59.999Z");
    }

    #[test]
    fn test_today_window_starts_after_midnight_gap() {
        let now = MidnightGap.with_ymd_and_hms(2024, 9, 8, 12, 0, 0).unwrap();
        let window = today_window(&now);

        // First wall time that exists is 01:00 at UTC-3.
        assert_eq!(window.time_min(), "2024-09-08T04:00:00.000Z");
        assert_eq!(window.time_max(), "2024-09-09T02:59:59.999Z");
    }

    #[test]
    fn test_today_window_without_gap_is_unshifted() {
        let now = MidnightGap.with_ymd_and_hms(2024, 9, 7, 12, 0, 0).unwrap();
        let window = today_window(&now);

        assert_eq!(window.time_min(), "2024-09-07T04:00:00.000Z");
    }
}

//! Date and time-of-day grammar shared by the DTR importer and the
//! record-creation endpoint.
//!
//! Everything here works on local wall-clock values (`NaiveDate`,
//! `NaiveDateTime`). A calendar date read from a file is never moved to
//! another day by an offset conversion.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

static TWELVE_HOUR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2}):(\d{2})(?::(\d{2}))?\s*(AM|PM)$").expect("12-hour pattern")
});

static TWENTY_FOUR_HOUR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("24-hour pattern"));

/// Years below this are rejected, so two-digit years such as `08/06/24`
/// never turn into year 24.
const MIN_YEAR: i64 = 1000;

/// Naive timestamp layouts accepted in a `date` column after RFC 3339 fails.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    #[error("Invalid time '{0}'")]
    InvalidTime(String),
}

/// Resolve a `date` cell to a calendar date.
///
/// A value containing `T` is read as a full timestamp and reduced to its
/// local date. Anything else must be three integers separated by `-` or `/`:
/// when the first one is greater than 31 it is `YEAR-MONTH-DAY`, otherwise
/// `MONTH/DAY/YEAR`. `05/06/2024` is therefore always May 6th. The year must
/// have four digits.
pub fn parse_date(raw: &str) -> Result<NaiveDate, TimeParseError> {
    let raw = raw.trim();
    let invalid = || TimeParseError::InvalidDate(raw.to_string());

    if raw.contains('T') {
        return parse_timestamp(raw).map(|ts| ts.date()).ok_or_else(invalid);
    }

    let parts: Vec<&str> = raw.split(['-', '/']).collect();
    if parts.len() != 3 {
        return Err(invalid());
    }

    let mut numbers = [0i64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part.trim().parse().map_err(|_| invalid())?;
    }

    let (year, month, day) = if numbers[0] > 31 {
        (numbers[0], numbers[1], numbers[2])
    } else {
        (numbers[2], numbers[0], numbers[1])
    };
    if year < MIN_YEAR {
        return Err(invalid());
    }

    let year = i32::try_from(year).map_err(|_| invalid())?;
    let month = u32::try_from(month).map_err(|_| invalid())?;
    let day = u32::try_from(day).map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Parse an absolute timestamp into local wall-clock time.
///
/// Offset-carrying values (RFC 3339) are converted to the host's local zone;
/// naive values are taken as already local.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Local).naive_local());
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Parse `H:MM[:SS] AM|PM` or `H:MM[:SS]` into a time of day.
pub fn parse_time(raw: &str) -> Result<NaiveTime, TimeParseError> {
    let raw = raw.trim();
    let invalid = || TimeParseError::InvalidTime(raw.to_string());

    if let Some(caps) = TWELVE_HOUR.captures(raw) {
        let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&hour) {
            return Err(invalid());
        }

        let pm = caps[4].eq_ignore_ascii_case("PM");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };

        return build_time(hour, &caps).ok_or_else(invalid);
    }

    if let Some(caps) = TWENTY_FOUR_HOUR.captures(raw) {
        let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
        return build_time(hour, &caps).ok_or_else(invalid);
    }

    Err(invalid())
}

fn build_time(hour: u32, caps: &Captures<'_>) -> Option<NaiveTime> {
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Parse a time-of-day string and pin it to `date`.
pub fn parse_time_on(date: NaiveDate, raw: &str) -> Result<NaiveDateTime, TimeParseError> {
    parse_time(raw).map(|time| date.and_time(time))
}

/// Hours between two instants, floored at zero.
pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        0.0
    } else {
        seconds as f64 / 3600.0
    }
}

pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn year_first_dates() {
        assert_eq!(parse_date("2024-08-06").unwrap(), date(2024, 8, 6));
        assert_eq!(parse_date("2024/8/6").unwrap(), date(2024, 8, 6));
    }

    #[test]
    fn month_first_dates() {
        assert_eq!(parse_date("08/06/2024").unwrap(), date(2024, 8, 6));
        // ambiguous day/month stays month-first
        assert_eq!(parse_date("05/06/2024").unwrap(), date(2024, 5, 6));
        assert_eq!(parse_date("12-31-2023").unwrap(), date(2023, 12, 31));
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(
            parse_date("2024-13-01"),
            Err(TimeParseError::InvalidDate("2024-13-01".into()))
        );
        assert!(parse_date("02/30/2024").is_err());
        assert!(parse_date("2024-08").is_err());
        assert!(parse_date("2024-08-06-01").is_err());
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn timestamp_dates_keep_wall_clock_day() {
        assert_eq!(parse_date("2024-08-06T23:30:00").unwrap(), date(2024, 8, 6));
        assert_eq!(parse_date("2024-08-06T00:15").unwrap(), date(2024, 8, 6));
        assert!(parse_date("2024-08-06Tnoon").is_err());
    }

    #[test]
    fn rejects_two_digit_years() {
        assert_eq!(
            parse_date("08/06/24"),
            Err(TimeParseError::InvalidDate("08/06/24".into()))
        );
        assert!(parse_date("1/2/999").is_err());
        assert_eq!(parse_date("1/2/1000").unwrap(), date(1000, 1, 2));
    }

    #[test]
    fn offset_timestamps_move_to_local_time() {
        use chrono::{TimeZone, Utc};

        let expected = Utc
            .with_ymd_and_hms(2024, 8, 6, 10, 0, 0)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();

        assert_eq!(parse_timestamp("2024-08-06T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-08-06T10:00:00Z"), Some(expected));
        assert_eq!(parse_date("2024-08-06T12:00:00+02:00").unwrap(), expected.date());
    }

    #[test]
    fn naive_timestamps_are_not_shifted() {
        assert_eq!(
            parse_timestamp("2024-08-06T23:30:00"),
            Some(date(2024, 8, 6).and_time(hms(23, 30, 0)))
        );
    }

    #[test]
    fn twelve_hour_times() {
        assert_eq!(parse_time("09:00 AM").unwrap(), hms(9, 0, 0));
        assert_eq!(parse_time("5:30 pm").unwrap(), hms(17, 30, 0));
        assert_eq!(parse_time("12:00 AM").unwrap(), hms(0, 0, 0));
        assert_eq!(parse_time("12:15 PM").unwrap(), hms(12, 15, 0));
        assert_eq!(parse_time("11:59:30PM").unwrap(), hms(23, 59, 30));
    }

    #[test]
    fn twenty_four_hour_times() {
        assert_eq!(parse_time("0:05").unwrap(), hms(0, 5, 0));
        assert_eq!(parse_time("17:45:10").unwrap(), hms(17, 45, 10));
    }

    #[test]
    fn rejects_bad_times() {
        for raw in ["13:00 PM", "0:30 AM", "24:00", "9:60", "9", "9:00 XM", "nine"] {
            assert_eq!(
                parse_time(raw),
                Err(TimeParseError::InvalidTime(raw.to_string())),
                "{raw}"
            );
        }
    }

    #[test]
    fn anchors_time_to_date() {
        let ts = parse_time_on(date(2024, 8, 6), "09:00 AM").unwrap();
        assert_eq!(ts.date(), date(2024, 8, 6));
        assert_eq!(ts.time(), hms(9, 0, 0));
    }

    #[test]
    fn hours_clamp_at_zero() {
        let day = date(2024, 8, 6);
        let start = day.and_time(hms(9, 0, 0));
        let end = day.and_time(hms(17, 30, 0));
        assert_eq!(hours_between(start, end), 8.5);
        assert_eq!(hours_between(end, start), 0.0);
        assert_eq!(round_hours(1.0 / 3.0), 0.33);
    }
}

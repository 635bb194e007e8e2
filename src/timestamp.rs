//! Timestamp recognition and parsing for WeChat message separators.
//!
//! WeChat renders two separator formats in a chat:
//!
//! - full form `2025年4月10日 20:44`, used for messages from previous days
//! - time-only form `20:44`, used for today's messages
//!
//! Time-only stamps carry no date and are always resolved against the date
//! supplied by the caller ("today"). A time-only stamp from an earlier day is
//! therefore misplaced onto today; the boundary search compensates for the
//! common case by comparing same-day stamps by minute of day only.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex_lite::Regex;

/// Source of the current wall-clock time.
///
/// Injected wherever "today" or "now" matters so tests can pin the date.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn full_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日 (\d{1,2}):(\d{2})").ok())
        .as_ref()
}

fn time_only_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").ok())
        .as_ref()
}

/// Returns true if the line has the shape of a message separator.
///
/// The full form is anchored at the start of the line only; the time-only
/// form must be the whole line. Shape says nothing about validity: `25:99`
/// is timestamp-shaped but does not parse.
///
/// # Examples
///
/// ```
/// use wechat_exporter::timestamp::is_timestamp;
///
/// assert!(is_timestamp("2025年4月10日 20:44"));
/// assert!(is_timestamp("9:05"));
/// assert!(!is_timestamp("meet at 9:05"));
/// assert!(!is_timestamp("9:05 tomorrow"));
/// ```
pub fn is_timestamp(text: &str) -> bool {
    full_pattern().map(|p| p.is_match(text)).unwrap_or(false)
        || time_only_pattern().map(|p| p.is_match(text)).unwrap_or(false)
}

/// Parse a timestamp-shaped line into an instant.
///
/// Time-only stamps are placed on `today`. Seconds are always zero. Returns
/// `None` for anything that is not a valid full or time-only stamp.
///
/// # Arguments
///
/// * `text` - The line to parse
/// * `today` - Date used for time-only stamps
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use wechat_exporter::timestamp::parse_timestamp;
///
/// let today = NaiveDate::from_ymd_opt(2025, 4, 12).unwrap();
///
/// let full = parse_timestamp("2025年4月10日 20:44", today).unwrap();
/// assert_eq!(full.to_string(), "2025-04-10 20:44:00");
///
/// let time_only = parse_timestamp("20:44", today).unwrap();
/// assert_eq!(time_only.to_string(), "2025-04-12 20:44:00");
///
/// assert!(parse_timestamp("2025年2月30日 10:00", today).is_none());
/// ```
pub fn parse_timestamp(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    if let Some(caps) = full_pattern().and_then(|p| p.captures(text)) {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
        let hour: u32 = caps.get(4)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(5)?.as_str().parse().ok()?;

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        return Some(date.and_time(time));
    }

    if let Some(caps) = time_only_pattern().and_then(|p| p.captures(text)) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;

        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        return Some(today.and_time(time));
    }

    None
}

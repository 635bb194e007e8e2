//! Boundary search within one snapshot of the message list.
//!
//! The boundary is the earliest-appearing timestamp at or before the cutoff
//! (the start of the export window). Finding it in the loaded part of the
//! list means enough history has been loaded; not finding it means the
//! pagination driver has to load older messages and look again.
//!
//! The list is not random-accessible and only grows at the top, so this is a
//! single forward scan rather than a binary search.

use chrono::{NaiveDateTime, Timelike};

use crate::classify::LineShape;
use crate::timestamp::parse_timestamp;
use crate::types::TextRun;

/// A timestamp line found at or before the cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    /// Index of the timestamp line within the scanned runs
    pub index: usize,
    pub text: String,
    pub instant: NaiveDateTime,
}

/// Returns true if a timestamp qualifies as the boundary for `cutoff`.
///
/// A candidate dated today is compared by minute of day only, ignoring both
/// dates; any other candidate is compared as a full instant. Both
/// comparisons are inclusive.
pub fn at_or_before(candidate: NaiveDateTime, cutoff: NaiveDateTime, now: NaiveDateTime) -> bool {
    if candidate.date() == now.date() {
        minute_of_day(candidate) <= minute_of_day(cutoff)
    } else {
        candidate <= cutoff
    }
}

fn minute_of_day(instant: NaiveDateTime) -> u32 {
    instant.hour() * 60 + instant.minute()
}

/// Find the first timestamp in `runs` at or before `cutoff`.
///
/// Lines that are not timestamp-shaped, or that are but fail to parse, are
/// skipped. `now` supplies today's date both for resolving time-only stamps
/// and for the same-day comparison rule.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use wechat_exporter::boundary::locate_boundary;
/// use wechat_exporter::TextRun;
///
/// let now = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(18, 0, 0).unwrap();
/// let cutoff = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(14, 30, 0).unwrap();
///
/// let runs = TextRun::sequence(["Alice", "14:31", "hi", "14:30", "Bob"]);
/// let boundary = locate_boundary(&runs, cutoff, now).unwrap();
/// assert_eq!(boundary.text, "14:30");
/// assert_eq!(boundary.index, 3);
/// ```
pub fn locate_boundary<'a, I>(runs: I, cutoff: NaiveDateTime, now: NaiveDateTime) -> Option<Boundary>
where
    I: IntoIterator<Item = &'a TextRun>,
{
    let today = now.date();
    runs.into_iter()
        .filter(|run| LineShape::of(&run.text) == LineShape::Timestamp)
        .find_map(|run| {
            let instant = parse_timestamp(&run.text, today)?;
            at_or_before(instant, cutoff, now).then(|| Boundary {
                index: run.index,
                text: run.text.clone(),
                instant,
            })
        })
}

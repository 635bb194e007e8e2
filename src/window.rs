//! Time windows and section-based filtering of the text stream.
//!
//! A chat list is a sequence of sections, each opened by a timestamp line and
//! running until the next one. Filtering keeps or drops whole sections: a
//! section is in range when its timestamp falls inside the window. Lines
//! before the first timestamp belong to a section whose stamp scrolled out of
//! the loaded range; they are kept only when no boundary was found (the whole
//! loaded range is then newer than the cutoff).

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::boundary::Boundary;
use crate::classify::LineShape;
use crate::timestamp::parse_timestamp;
use crate::types::TextRun;

/// Closed interval `[start, end]`; a `None` bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    /// The last `hours` hours up to and including `now`.
    ///
    /// Returns `None` when the start would fall outside the representable
    /// date range.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use wechat_exporter::window::TimeWindow;
    ///
    /// let now = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(23, 0, 0).unwrap();
    /// let window = TimeWindow::last_hours(14, now).unwrap();
    /// assert_eq!(window.start.unwrap().to_string(), "2025-04-10 09:00:00");
    /// assert_eq!(window.end, Some(now));
    /// assert!(TimeWindow::last_hours(u32::MAX, now).is_none());
    /// ```
    pub fn last_hours(hours: u32, now: NaiveDateTime) -> Option<Self> {
        let start = now.checked_sub_signed(Duration::hours(i64::from(hours)))?;
        Some(Self {
            start: Some(start),
            end: Some(now),
        })
    }

    /// An explicit range; an open end defaults to `now`.
    pub fn range(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            start,
            end: Some(end.unwrap_or(now)),
        }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start.map_or(true, |start| instant >= start)
            && self.end.map_or(true, |end| instant <= end)
    }

    /// The window collection actually starts from once the boundary is known.
    ///
    /// The boundary's section can hold messages after the cutoff, so the
    /// effective start moves back to the boundary's own timestamp.
    pub fn from_boundary(&self, boundary: Option<&Boundary>) -> TimeWindow {
        match boundary {
            Some(b) => TimeWindow {
                start: Some(b.instant),
                end: self.end,
            },
            None => *self,
        }
    }
}

/// Keep the sections of `runs` whose timestamp lies inside `window`.
///
/// Timestamp-shaped lines that fail to parse do not open a new section; they
/// stay with the section they appear in. Indexes are preserved.
///
/// # Arguments
///
/// * `runs` - The accumulated stream, oldest first
/// * `window` - Effective window (see [`TimeWindow::from_boundary`])
/// * `boundary_found` - Whether the cutoff boundary was located
/// * `now` - Supplies today's date for time-only stamps
pub fn filter_to_window(
    runs: &[TextRun],
    window: &TimeWindow,
    boundary_found: bool,
    now: NaiveDateTime,
) -> Vec<TextRun> {
    let today = now.date();
    let mut in_window = !boundary_found;

    runs.iter()
        .filter(|run| {
            if LineShape::of(&run.text) == LineShape::Timestamp {
                if let Some(instant) = parse_timestamp(&run.text, today) {
                    in_window = window.contains(instant);
                }
            }
            in_window
        })
        .cloned()
        .collect()
}

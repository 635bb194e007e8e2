//! Duplicate suppression for the classified transcript.
//!
//! Pagination re-reads rows that were already visible, and the flat text
//! stream repeats a speaker's name next to each of their messages. The
//! deduplicator collapses that into a minimal transcript:
//!
//! - Timestamp lines are always kept.
//! - System notices are always kept verbatim.
//! - Sender labels (which by construction differ from the last sender) are kept.
//! - Content lines are dropped when they duplicate earlier output: anywhere
//!   in the output with [`Strictness::Global`], or only the line right before
//!   them with [`Strictness::Adjacent`].
//!
//! Global suppression also drops legitimately repeated short messages
//! ("ok", "+1"). It is the default for compatibility with earlier exports;
//! `Adjacent` trades some leftover duplicates for not losing those.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{ClassifiedLine, LineKind};

/// How aggressively duplicate content lines are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Drop content equal to any line already in the output
    #[default]
    Global,
    /// Drop content equal to the immediately preceding output line
    Adjacent,
}

impl std::str::FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Strictness::Global),
            "adjacent" => Ok(Strictness::Adjacent),
            other => Err(format!(
                "unknown strictness '{}' (expected 'global' or 'adjacent')",
                other
            )),
        }
    }
}

/// Single-pass deduplicator with one line of lookback.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    strictness: Strictness,
    output: Vec<ClassifiedLine>,
    seen: HashSet<String>,
    last_timestamp: Option<String>,
    last_sender: Option<String>,
}

impl Deduplicator {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            output: Vec::new(),
            seen: HashSet::new(),
            last_timestamp: None,
            last_sender: None,
        }
    }

    /// Offer the next line. Returns true if it was kept.
    pub fn push(&mut self, line: ClassifiedLine) -> bool {
        if line.text.trim().is_empty() {
            return false;
        }

        let keep = match line.kind {
            LineKind::Timestamp => {
                self.last_timestamp = Some(line.text.clone());
                true
            }
            LineKind::SystemNotice => true,
            LineKind::SenderLabel if self.last_sender.as_deref() != Some(line.text.as_str()) => {
                self.last_sender = Some(line.text.clone());
                true
            }
            LineKind::SenderLabel | LineKind::Content => !self.is_duplicate(&line.text),
        };

        if keep {
            self.seen.insert(line.text.clone());
            self.output.push(line);
        }
        keep
    }

    fn is_duplicate(&self, text: &str) -> bool {
        match self.strictness {
            Strictness::Global => self.seen.contains(text),
            Strictness::Adjacent => self.output.last().map(|l| l.text.as_str()) == Some(text),
        }
    }

    /// The most recent timestamp line kept.
    pub fn last_timestamp(&self) -> Option<&str> {
        self.last_timestamp.as_deref()
    }

    pub fn finish(self) -> Vec<ClassifiedLine> {
        self.output
    }
}

/// Deduplicate a classified stream in one call.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use wechat_exporter::classify::classify_all;
/// use wechat_exporter::dedup::{dedup_lines, Strictness};
/// use wechat_exporter::TextRun;
///
/// let today = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
/// let lines = classify_all(TextRun::sequence(["Alice", "hello", "hello", "Bob", "hi"]), today);
///
/// let texts: Vec<String> = dedup_lines(lines, Strictness::Global)
///     .into_iter()
///     .map(|line| line.text)
///     .collect();
/// assert_eq!(texts, vec!["Alice", "hello", "Bob", "hi"]);
/// ```
pub fn dedup_lines<I>(lines: I, strictness: Strictness) -> Vec<ClassifiedLine>
where
    I: IntoIterator<Item = ClassifiedLine>,
{
    let mut dedup = Deduplicator::new(strictness);
    for line in lines {
        dedup.push(line);
    }
    dedup.finish()
}

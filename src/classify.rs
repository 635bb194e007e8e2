//! Line classification for the flat text stream read from the message list.
//!
//! The list has no structural markup that separates speakers from message
//! bodies, so classification is done with pattern rules, in this order:
//!
//! 1. **Timestamp**: the line is a message separator (see [`crate::timestamp`])
//! 2. **SystemNotice**: the line contains a known client-generated string
//! 3. **SenderLabel**: anything else that differs from the last sender label
//! 4. **Content**: anything else
//!
//! Rule 3 makes classification stateful: whether a line is a sender label
//! depends on the lines classified before it. [`LineClassifier`] owns that
//! state for one pass over one stream. Content lines always repeat the
//! current sender, which is exactly the shape the deduplicator suppresses.

use chrono::NaiveDate;

use crate::timestamp::{is_timestamp, parse_timestamp};
use crate::types::{ClassifiedLine, LineKind, TextRun};

/// Strings WeChat renders on its own: the list's "消息" placeholder, the
/// "查看更多消息" (view more messages) affordance, the inline image
/// placeholder, and the "message recalled" notice.
pub const SYSTEM_NOTICES: &[&str] = &["消息", "查看更多消息", "[图片]", "撤回了一条消息"];

/// Returns true if the line contains any known system string.
///
/// This is a substring test, so any line mentioning "消息" counts.
///
/// # Examples
///
/// ```
/// use wechat_exporter::classify::is_system_notice;
///
/// assert!(is_system_notice("[图片]"));
/// assert!(is_system_notice("Alice撤回了一条消息"));
/// assert!(!is_system_notice("hello"));
/// ```
pub fn is_system_notice(text: &str) -> bool {
    SYSTEM_NOTICES.iter().any(|notice| text.contains(notice))
}

/// The stateless part of classification: rules 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    Timestamp,
    SystemNotice,
    /// Sender label or content; needs stream context to tell apart
    Text,
}

impl LineShape {
    pub fn of(text: &str) -> Self {
        if is_timestamp(text) {
            LineShape::Timestamp
        } else if is_system_notice(text) {
            LineShape::SystemNotice
        } else {
            LineShape::Text
        }
    }
}

/// Streaming classifier for one pass over a text stream.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use wechat_exporter::classify::LineClassifier;
/// use wechat_exporter::{LineKind, TextRun};
///
/// let today = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
/// let mut classifier = LineClassifier::new(today);
///
/// let kinds: Vec<LineKind> = TextRun::sequence(["20:44", "Alice", "hello", "hello"])
///     .into_iter()
///     .map(|run| classifier.classify(run).kind)
///     .collect();
///
/// assert_eq!(
///     kinds,
///     vec![LineKind::Timestamp, LineKind::SenderLabel, LineKind::SenderLabel, LineKind::Content]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct LineClassifier {
    today: NaiveDate,
    last_sender: Option<String>,
}

impl LineClassifier {
    /// Creates a classifier that resolves time-only stamps against `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            last_sender: None,
        }
    }

    /// Classify the next line of the stream.
    pub fn classify(&mut self, run: TextRun) -> ClassifiedLine {
        let (kind, instant) = match LineShape::of(&run.text) {
            LineShape::Timestamp => (LineKind::Timestamp, parse_timestamp(&run.text, self.today)),
            LineShape::SystemNotice => (LineKind::SystemNotice, None),
            LineShape::Text if self.last_sender.as_deref() != Some(run.text.as_str()) => {
                self.last_sender = Some(run.text.clone());
                (LineKind::SenderLabel, None)
            }
            LineShape::Text => (LineKind::Content, None),
        };

        ClassifiedLine {
            index: run.index,
            text: run.text,
            kind,
            instant,
        }
    }

    /// The most recent sender label, if any.
    pub fn last_sender(&self) -> Option<&str> {
        self.last_sender.as_deref()
    }
}

/// Classify a whole stream with a fresh classifier.
pub fn classify_all<I>(runs: I, today: NaiveDate) -> Vec<ClassifiedLine>
where
    I: IntoIterator<Item = TextRun>,
{
    let mut classifier = LineClassifier::new(today);
    runs.into_iter().map(|run| classifier.classify(run)).collect()
}

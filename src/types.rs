//! Core data types for the wechat-exporter crate.
//!
//! This module defines the fundamental types used throughout the crate:
//! - `TextRun`: A single piece of text observed in the UI tree
//! - `LineKind` / `ClassifiedLine`: A text run tagged with its role in the transcript
//! - `ExportSummary`: JSON-serializable description of a finished run
//! - `StructureSummary`: The same for a structure dump
//! - `UiError` / `ExportError`: Error types for automation calls and whole runs

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// A single piece of text observed in the message list.
///
/// Text runs are produced fresh for every snapshot of the list and are never
/// persisted. The `index` is the position of the run in tree-traversal order
/// (or, after snapshots have been merged, its position in the accumulated
/// stream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    /// Position in depth-first pre-order traversal
    pub index: usize,

    /// The element's window text with surrounding whitespace removed
    pub text: String,
}

impl TextRun {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Builds an indexed run sequence from plain strings.
    ///
    /// # Example
    ///
    /// ```
    /// use wechat_exporter::TextRun;
    ///
    /// let runs = TextRun::sequence(["10:00", "Alice", "hello"]);
    /// assert_eq!(runs[2].index, 2);
    /// assert_eq!(runs[2].text, "hello");
    /// ```
    pub fn sequence<I, S>(texts: I) -> Vec<TextRun>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| TextRun::new(index, text))
            .collect()
    }
}

/// The role a line plays in the reconstructed transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// `2025年4月10日 20:44` or `20:44`
    Timestamp,
    /// Placeholder or notice rendered by the client itself
    SystemNotice,
    /// Start of a new speaker turn
    SenderLabel,
    /// Message body
    Content,
}

impl LineKind {
    /// Returns the string identifier for this kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use wechat_exporter::LineKind;
    ///
    /// assert_eq!(LineKind::Timestamp.as_str(), "timestamp");
    /// assert_eq!(LineKind::SenderLabel.as_str(), "sender_label");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Timestamp => "timestamp",
            LineKind::SystemNotice => "system_notice",
            LineKind::SenderLabel => "sender_label",
            LineKind::Content => "content",
        }
    }
}

/// A text run tagged with its kind.
///
/// For `LineKind::Timestamp` lines, `instant` holds the resolved point in
/// time, or `None` when the line has a timestamp shape but could not be
/// parsed (e.g. `25:61`). It is always `None` for the other kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    pub index: usize,
    pub text: String,
    pub kind: LineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant: Option<NaiveDateTime>,
}

/// Description of a finished export run.
///
/// Printed as JSON on stdout by the CLI once the artifact has been written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Conversation that was exported
    pub conversation: String,

    /// Path of the written artifact
    pub path: PathBuf,

    /// Number of transcript lines written (header excluded)
    pub line_count: usize,

    /// Effective start of the exported range, if bounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<NaiveDateTime>,

    /// Effective end of the exported range
    pub window_end: NaiveDateTime,

    /// Whether the cutoff boundary was found before pagination stopped
    pub complete: bool,

    /// Number of load-more cycles performed
    pub attempts: u32,

    /// Warning recorded when pagination was exhausted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Description of a written structure dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSummary {
    pub conversation: String,
    pub path: PathBuf,
    /// Number of captures written, one per section
    pub captures: usize,
    /// Elements in the last capture
    pub elements: usize,
    /// Load-more cycles between captures
    pub attempts: u32,
}

/// Errors returned by a single UI-automation call.
///
/// These are per-call failures: the text, geometry or children of one element
/// being unavailable, or one synthetic input event being rejected. During
/// extraction they are converted into "no data for this node" rather than
/// propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UiError {
    /// The element (or one of its properties) could not be read
    #[error("Element unavailable: {0}")]
    ElementUnavailable(String),

    /// No element matched a lookup
    #[error("Element not found: {0}")]
    NotFound(String),

    /// A synthetic keyboard or mouse event was rejected
    #[error("Input failed: {0}")]
    InputFailed(String),

    /// The operation is not supported by this element or backend
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Errors that abort an export run.
///
/// Any of these means no artifact is written.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The WeChat main window could not be found
    #[error("Window not found: {0}")]
    WindowNotFound(String),

    /// The message list control could not be located in the window
    #[error("Message list not found: {0}")]
    ListNotFound(String),

    /// The message list became inaccessible during pagination
    #[error("Message list inaccessible: {0}")]
    ListInaccessible(String),

    /// An interaction the run depends on failed
    #[error("UI automation error: {0}")]
    Ui(#[from] UiError),

    /// Writing the artifact failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be resolved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No UI-automation backend exists for this platform
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

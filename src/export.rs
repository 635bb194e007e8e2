//! Export writer: renders the transcript artifact and writes it to disk.
//!
//! The artifact is a small markdown file:
//!
//! ```text
//! # A旗舰船队 聊天记录 - 2025-04-10 23:00
//!
//! 时间范围: 2025-04-10 09:00:00 至 2025-04-10 23:00:00
//!
//! 2025年4月10日 20:44
//!
//! Alice
//!
//! hello
//! ```
//!
//! Structure dumps are written the same way, as
//! `<conversation>_structure_<timestamp>.md` with one section per capture.
//!
//! Files are never overwritten. Two runs in the same second for the same
//! conversation get `_2`, `_3`, ... suffixes.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::types::ClassifiedLine;
use crate::window::TimeWindow;

const RANGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_SUFFIX: u32 = 1000;

/// Everything the header needs besides the transcript itself.
#[derive(Debug, Clone)]
pub struct ExportHeader<'a> {
    pub conversation: &'a str,
    pub exported_at: NaiveDateTime,
    pub window: TimeWindow,
    pub warning: Option<&'a str>,
}

/// Render the full artifact text.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use wechat_exporter::export::{render_transcript, ExportHeader};
/// use wechat_exporter::window::TimeWindow;
///
/// let now = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(23, 0, 0).unwrap();
/// let header = ExportHeader {
///     conversation: "A旗舰船队",
///     exported_at: now,
///     window: TimeWindow::last_hours(14, now).unwrap(),
///     warning: None,
/// };
///
/// let text = render_transcript(&header, &[]);
/// assert!(text.starts_with("# A旗舰船队 聊天记录 - 2025-04-10 23:00\n"));
/// ```
pub fn render_transcript(header: &ExportHeader<'_>, lines: &[ClassifiedLine]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# {} 聊天记录 - {}\n\n",
        header.conversation,
        header.exported_at.format("%Y-%m-%d %H:%M")
    ));
    out.push_str(&format!(
        "时间范围: {} 至 {}\n\n",
        format_bound(header.window.start, "最早"),
        format_bound(header.window.end, "现在")
    ));
    if let Some(warning) = header.warning {
        out.push_str(&format!("警告: {}\n\n", warning));
    }
    for line in lines {
        out.push_str(&line.text);
        out.push_str("\n\n");
    }
    out
}

fn format_bound(bound: Option<NaiveDateTime>, open: &str) -> String {
    bound
        .map(|instant| instant.format(RANGE_FORMAT).to_string())
        .unwrap_or_else(|| open.to_string())
}

/// Replace characters that are not allowed in file names.
///
/// # Examples
///
/// ```
/// use wechat_exporter::export::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("A/B: test?"), "A_B_ test_");
/// assert_eq!(sanitize_file_name("  "), "conversation");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        "conversation".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<conversation>_messages_<YYYY-MM-DD_HH-MM-SS>.md`
pub fn export_file_name(conversation: &str, run_time: NaiveDateTime) -> String {
    format!(
        "{}_messages_{}.md",
        sanitize_file_name(conversation),
        run_time.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// `<conversation>_structure_<YYYY-MM-DD_HH-MM-SS>.md`
pub fn structure_file_name(conversation: &str, run_time: NaiveDateTime) -> String {
    format!(
        "{}_structure_{}.md",
        sanitize_file_name(conversation),
        run_time.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Render a structure dump: a title, then one numbered section per capture.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use wechat_exporter::export::render_structure_dump;
///
/// let now = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(23, 0, 0).unwrap();
/// let captures = vec![vec!["List - '消息'    (0, 0, 1, 1)".to_string()]];
///
/// assert_eq!(
///     render_structure_dump("A旗舰船队", now, &captures),
///     "# A旗舰船队 消息结构 - 2025-04-10 23:00\n\n## 快照 1\n\nList - '消息'    (0, 0, 1, 1)\n\n"
/// );
/// ```
pub fn render_structure_dump(
    conversation: &str,
    exported_at: NaiveDateTime,
    captures: &[Vec<String>],
) -> String {
    let mut out = format!(
        "# {} 消息结构 - {}\n\n",
        conversation,
        exported_at.format("%Y-%m-%d %H:%M")
    );
    for (n, lines) in captures.iter().enumerate() {
        out.push_str(&format!("## 快照 {}\n\n", n + 1));
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn suffixed(file_name: &str, n: u32) -> String {
    match file_name.strip_suffix(".md") {
        Some(stem) => format!("{}_{}.md", stem, n),
        None => format!("{}_{}", file_name, n),
    }
}

/// Write the transcript into `dir` (see [`write_artifact`]).
pub fn write_transcript(
    dir: &Path,
    header: &ExportHeader<'_>,
    lines: &[ClassifiedLine],
) -> io::Result<PathBuf> {
    let content = render_transcript(header, lines);
    let base = export_file_name(header.conversation, header.exported_at);
    let path = write_artifact(dir, &base, &content)?;
    log::info!("[WX-EXPORT] wrote {} lines to {}", lines.len(), path.display());
    Ok(path)
}

/// Write a structure dump into `dir` (see [`write_artifact`]).
pub fn write_structure(
    dir: &Path,
    conversation: &str,
    exported_at: NaiveDateTime,
    captures: &[Vec<String>],
) -> io::Result<PathBuf> {
    let content = render_structure_dump(conversation, exported_at, captures);
    let base = structure_file_name(conversation, exported_at);
    let path = write_artifact(dir, &base, &content)?;
    log::info!("[WX-EXPORT] wrote {} captures to {}", captures.len(), path.display());
    Ok(path)
}

/// Write `content` into `dir` as `base`, creating the directory if needed.
///
/// The file is created exclusively; on a name collision the next free
/// numeric suffix is used. If writing fails the partial file is removed.
///
/// # Returns
///
/// The path of the written file.
pub fn write_artifact(dir: &Path, base: &str, content: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    for attempt in 1..=MAX_SUFFIX {
        let name = if attempt == 1 {
            base.to_string()
        } else {
            suffixed(base, attempt)
        };
        let path = dir.join(name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };

        if let Err(e) = file.write_all(content.as_bytes()).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        return Ok(path);
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {} in {}", base, dir.display()),
    ))
}

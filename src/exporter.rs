//! Export orchestration.
//!
//! This module provides the `ChatExporter` struct which runs the whole
//! pipeline against the WeChat desktop client:
//!
//! 1. Connect to the main window and open the target conversation
//! 2. Locate the message list
//! 3. Paginate until the start of the time window is loaded
//! 4. Filter, classify and deduplicate the accumulated text
//! 5. Write the transcript artifact
//!
//! A structure dump runs steps 1-2, then captures the list's element tree
//! (optionally once more after every load-more step) into a file.
//!
//! Steps 1-3 go through the [`Desktop`] and [`UiElement`] traits, so the
//! same code runs against the Windows backend and against in-memory fakes.

use chrono::NaiveDateTime;

use crate::boundary::Boundary;
use crate::classify::classify_all;
use crate::config::{Config, ScrollMethod};
use crate::dedup::{dedup_lines, Strictness};
use crate::export::{write_structure, write_transcript, ExportHeader};
use crate::pagination::{
    merge_snapshot, FixedDelay, Immediate, LoadAction, MessageList, PaginationDriver, ScrollState,
    Settle,
};
use crate::text_runs::TextRuns;
use crate::timestamp::Clock;
use crate::types::{ClassifiedLine, ExportError, ExportSummary, StructureSummary, TextRun, UiError};
use crate::ui::{render_structure, ControlType, Desktop, ElementNode, Key, Point, UiElement};
use crate::window::{filter_to_window, TimeWindow};

/// Name of the message list control.
pub const MESSAGE_LIST_NAME: &str = "消息";

/// Text of the button WeChat shows above the oldest loaded message.
pub const LOAD_MORE_TEXT: &str = "查看更多消息";

/// Vertical distance kept from the list edges when dragging the scrollbar.
const DRAG_MARGIN: i32 = 50;
const DRAG_STEP: i32 = 10;
/// Horizontal offset of the scrollbar from the list's right edge.
const SCROLLBAR_INSET: i32 = 10;

/// Wait strategies for the three kinds of UI action.
#[derive(Debug, Clone)]
pub struct Waits<S: Settle> {
    /// After focus changes and keystrokes
    pub action: S,
    /// After submitting the conversation search
    pub search: S,
    /// After each pagination step
    pub page: S,
}

impl Waits<FixedDelay> {
    pub fn from_config(config: &Config) -> Self {
        Self {
            action: FixedDelay(config.action_delay()),
            search: FixedDelay(config.search_delay()),
            page: FixedDelay(config.settle_delay()),
        }
    }
}

impl Waits<Immediate> {
    pub fn immediate() -> Self {
        Self {
            action: Immediate,
            search: Immediate,
            page: Immediate,
        }
    }
}

/// Depth-first search of a live subtree.
///
/// Elements whose children cannot be listed are treated as leaves.
fn find_element<E, P>(root: E, predicate: P) -> Option<E>
where
    E: UiElement,
    P: Fn(&E) -> bool,
{
    let mut stack = vec![root];
    while let Some(element) = stack.pop() {
        if predicate(&element) {
            return Some(element);
        }
        match element.children() {
            Ok(children) => stack.extend(children.into_iter().rev()),
            Err(e) => log::debug!("[WX-EXPORT] search skipped a subtree: {}", e),
        }
    }
    None
}

fn is_control<E: UiElement>(element: &E, control_type: &ControlType) -> bool {
    element.control_type().ok().as_ref() == Some(control_type)
}

fn has_text<E: UiElement>(element: &E, text: &str) -> bool {
    element.text().map(|t| t.trim() == text).unwrap_or(false)
}

fn is_visible<E: UiElement>(element: &E) -> bool {
    element.is_visible().unwrap_or(false)
}

/// Message texts of a captured list.
///
/// The list's own name and the load-more button sit above the oldest
/// message in every capture; both are left out so captures overlap.
fn message_runs(list: &ElementNode) -> Vec<TextRun> {
    TextRun::sequence(
        list.children
            .iter()
            .flat_map(TextRuns::new)
            .map(|run| run.text)
            .filter(|text| text != LOAD_MORE_TEXT),
    )
}

/// A connected WeChat main window.
pub struct WeChatSession<'a, D: Desktop, S: Settle> {
    desktop: &'a D,
    window: D::Element,
    waits: &'a Waits<S>,
}

impl<'a, D, S> WeChatSession<'a, D, S>
where
    D: Desktop,
    D::Element: Clone,
    S: Settle,
{
    /// Find the main window by class name.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::WindowNotFound` if no such window exists.
    pub fn connect(desktop: &'a D, window_class: &str, waits: &'a Waits<S>) -> Result<Self, ExportError> {
        let window = desktop.connect(window_class).map_err(|e| {
            ExportError::WindowNotFound(format!("class '{}': {}", window_class, e))
        })?;
        log::info!("[WX-EXPORT] connected to window class '{}'", window_class);
        Ok(Self {
            desktop,
            window,
            waits,
        })
    }

    /// Open a conversation through the client's search box.
    ///
    /// Focus the window, press Ctrl+F, type the name and press Enter, waiting
    /// after each step for the client to catch up.
    pub fn open_conversation(&self, name: &str) -> Result<(), ExportError> {
        log::info!("[WX-EXPORT] opening conversation '{}'", name);
        self.window.focus()?;
        self.waits.action.settle();

        self.desktop.press_key(Key::Ctrl('f'))?;
        self.waits.action.settle();

        self.desktop.type_text(name)?;
        self.waits.action.settle();

        self.desktop.press_key(Key::Enter)?;
        self.waits.search.settle();
        Ok(())
    }

    /// Locate the message list of the open conversation.
    ///
    /// Prefers a `List` control named "消息" and falls back to the first
    /// visible `List`. Focusing the list is best-effort.
    pub fn locate_message_list(&self, scroll_method: ScrollMethod) -> Result<ChatList<'a, D>, ExportError> {
        let named = find_element(self.window.clone(), |e| {
            is_control(e, &ControlType::List) && has_text(e, MESSAGE_LIST_NAME)
        });

        let list = match named {
            Some(list) => list,
            None => {
                log::warn!(
                    "[WX-EXPORT] no List named '{}', falling back to the first visible List",
                    MESSAGE_LIST_NAME
                );
                find_element(self.window.clone(), |e| {
                    is_control(e, &ControlType::List) && is_visible(e)
                })
                .ok_or_else(|| ExportError::ListNotFound("no List control in the window".to_string()))?
            }
        };

        if let Err(e) = list.focus() {
            log::debug!("[WX-EXPORT] could not focus message list: {}", e);
        }
        log::info!("[WX-EXPORT] located message list");

        Ok(ChatList {
            desktop: self.desktop,
            list,
            scroll_method,
        })
    }
}

/// The live message list, paginated through load-more clicks and scrolling.
pub struct ChatList<'a, D: Desktop> {
    desktop: &'a D,
    list: D::Element,
    scroll_method: ScrollMethod,
}

impl<'a, D> ChatList<'a, D>
where
    D: Desktop,
    D::Element: Clone,
{
    /// Capture the list's current element tree.
    pub fn capture(&self) -> Result<ElementNode, ExportError> {
        ElementNode::capture(&self.list).map_err(|e| ExportError::ListInaccessible(e.to_string()))
    }

    fn load_more_button(&self) -> Option<D::Element> {
        find_element(self.list.clone(), |e| {
            is_control(e, &ControlType::Button) && has_text(e, LOAD_MORE_TEXT) && is_visible(e)
        })
    }

    fn click(&self, element: &D::Element) -> Result<(), UiError> {
        match element.rect() {
            Ok(rect) => {
                let center = rect.center();
                self.desktop.mouse_move(center)?;
                self.desktop.mouse_press(center)?;
                self.desktop.mouse_release(center)
            }
            Err(_) => element.click(),
        }
    }

    fn scroll(&self) -> Result<(), UiError> {
        match self.scroll_method {
            ScrollMethod::PageUp => {
                if let Err(e) = self.list.focus() {
                    log::debug!("[WX-EXPORT] could not focus list before PageUp: {}", e);
                }
                self.desktop.press_key(Key::PageUp)
            }
            ScrollMethod::Drag => self.drag_scrollbar_up(),
        }
    }

    /// Drag the scrollbar thumb from the bottom of the list towards the top.
    fn drag_scrollbar_up(&self) -> Result<(), UiError> {
        let rect = self.list.rect()?;
        let x = rect.right - SCROLLBAR_INSET;
        let top = rect.top + DRAG_MARGIN;
        let bottom = rect.bottom - DRAG_MARGIN;
        if bottom <= top {
            return Err(UiError::Unsupported(format!(
                "message list too small to drag ({}px high)",
                rect.height()
            )));
        }

        self.desktop.mouse_move(Point::new(x, bottom))?;
        self.desktop.mouse_press(Point::new(x, bottom))?;
        let mut y = bottom;
        while y > top {
            y = (y - DRAG_STEP).max(top);
            self.desktop.mouse_move(Point::new(x, y))?;
        }
        self.desktop.mouse_release(Point::new(x, top))
    }
}

impl<'a, D> MessageList for ChatList<'a, D>
where
    D: Desktop,
    D::Element: Clone,
{
    fn snapshot(&mut self) -> Result<Vec<TextRun>, ExportError> {
        Ok(message_runs(&self.capture()?))
    }

    fn load_more(&mut self) -> Result<LoadAction, ExportError> {
        if let Some(button) = self.load_more_button() {
            match self.click(&button) {
                Ok(()) => return Ok(LoadAction::ClickedLoadMore),
                Err(e) => log::debug!("[WX-EXPORT] load-more click failed, scrolling instead: {}", e),
            }
        }
        self.scroll()?;
        Ok(LoadAction::Scrolled)
    }
}

/// Reduce the accumulated stream to the final transcript.
///
/// The stream is cut to the effective window first, then classified and
/// deduplicated. Returns the effective window alongside the lines.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use wechat_exporter::dedup::Strictness;
/// use wechat_exporter::exporter::build_transcript;
/// use wechat_exporter::window::TimeWindow;
/// use wechat_exporter::TextRun;
///
/// let now = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(23, 0, 0).unwrap();
/// let start = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let window = TimeWindow::range(Some(start), None, now);
///
/// let runs = TextRun::sequence(["2025年4月10日 20:44", "Alice", "hello", "hello", "Bob", "hi"]);
/// let (_, lines) = build_transcript(&runs, None, &window, now, Strictness::Global);
///
/// let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
/// assert_eq!(texts, vec!["2025年4月10日 20:44", "Alice", "hello", "Bob", "hi"]);
/// ```
pub fn build_transcript(
    runs: &[TextRun],
    boundary: Option<&Boundary>,
    window: &TimeWindow,
    now: NaiveDateTime,
    strictness: Strictness,
) -> (TimeWindow, Vec<ClassifiedLine>) {
    let effective = window.from_boundary(boundary);
    let in_window = filter_to_window(runs, &effective, boundary.is_some(), now);
    let classified = classify_all(in_window, now.date());
    (effective, dedup_lines(classified, strictness))
}

/// Runs exports for one configuration.
pub struct ChatExporter<'c> {
    config: &'c Config,
}

impl<'c> ChatExporter<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Export against the native desktop backend.
    ///
    /// # Errors
    ///
    /// `ExportError::UnsupportedPlatform` off Windows; otherwise any fatal
    /// error from [`ChatExporter::export_with`].
    #[cfg(target_os = "windows")]
    pub fn run<C: Clock>(&self, clock: &C) -> Result<ExportSummary, ExportError> {
        let desktop = crate::platform::windows::WindowsDesktop::new()?;
        self.export_with(&desktop, &Waits::from_config(self.config), clock)
    }

    #[cfg(not(target_os = "windows"))]
    pub fn run<C: Clock>(&self, _clock: &C) -> Result<ExportSummary, ExportError> {
        Err(ExportError::UnsupportedPlatform(
            "WeChat UI automation is only available on Windows".to_string(),
        ))
    }

    /// Dump the message list's structure against the native backend.
    #[cfg(target_os = "windows")]
    pub fn dump_structure<C: Clock>(&self, clock: &C, paginate: bool) -> Result<StructureSummary, ExportError> {
        let desktop = crate::platform::windows::WindowsDesktop::new()?;
        self.dump_structure_with(&desktop, &Waits::from_config(self.config), clock, paginate)
    }

    #[cfg(not(target_os = "windows"))]
    pub fn dump_structure<C: Clock>(&self, _clock: &C, _paginate: bool) -> Result<StructureSummary, ExportError> {
        Err(ExportError::UnsupportedPlatform(
            "WeChat UI automation is only available on Windows".to_string(),
        ))
    }

    /// Run the full pipeline against `desktop`.
    ///
    /// # Returns
    ///
    /// A summary of the written artifact. Exhausted pagination still
    /// produces an artifact; the summary then carries a warning.
    pub fn export_with<D, S, C>(
        &self,
        desktop: &D,
        waits: &Waits<S>,
        clock: &C,
    ) -> Result<ExportSummary, ExportError>
    where
        D: Desktop,
        D::Element: Clone,
        S: Settle,
        C: Clock,
    {
        let config = self.config;
        let now = clock.now();
        let window = config.resolve_window(now)?;
        log::info!(
            "[WX-EXPORT] exporting '{}' from {} to {}",
            config.target.conversation,
            window.start.map(|s| s.to_string()).unwrap_or_else(|| "the beginning".to_string()),
            window.end.unwrap_or(now)
        );

        let session = WeChatSession::connect(desktop, &config.target.window_class, waits)?;
        session.open_conversation(&config.target.conversation)?;
        let mut list = session.locate_message_list(config.pagination.scroll_method)?;

        let mut driver = PaginationDriver::new(
            &waits.page,
            config.pagination.max_attempts,
            config.pagination.stall_limit,
        );
        let outcome = driver.run(&mut list, window.start, now)?;
        let warning = outcome.warning();

        let (effective, lines) = build_transcript(
            &outcome.runs,
            outcome.boundary(),
            &window,
            now,
            config.dedup.strictness,
        );
        log::info!(
            "[WX-EXPORT] {} lines loaded, {} kept after filtering",
            outcome.runs.len(),
            lines.len()
        );

        let header = ExportHeader {
            conversation: &config.target.conversation,
            exported_at: now,
            window: effective,
            warning: warning.as_deref(),
        };
        let path = write_transcript(&config.output.export_dir, &header, &lines)?;

        Ok(ExportSummary {
            conversation: config.target.conversation.clone(),
            path,
            line_count: lines.len(),
            window_start: effective.start,
            window_end: effective.end.unwrap_or(now),
            complete: outcome.boundary().is_some(),
            attempts: outcome.attempts,
            warning,
        })
    }

    /// Capture the message list's element tree and write it to the export
    /// directory, one element per line.
    ///
    /// With `paginate`, the list is captured again after every load-more
    /// step until `max_attempts` loads have run or `stall_limit` loads in a
    /// row add no messages. Each capture becomes its own section.
    ///
    /// # Errors
    ///
    /// Connection and lookup errors as for [`ChatExporter::export_with`];
    /// a failed capture or load step is fatal and writes nothing.
    pub fn dump_structure_with<D, S, C>(
        &self,
        desktop: &D,
        waits: &Waits<S>,
        clock: &C,
        paginate: bool,
    ) -> Result<StructureSummary, ExportError>
    where
        D: Desktop,
        D::Element: Clone,
        S: Settle,
        C: Clock,
    {
        let config = self.config;
        let now = clock.now();

        let session = WeChatSession::connect(desktop, &config.target.window_class, waits)?;
        session.open_conversation(&config.target.conversation)?;
        let mut list = session.locate_message_list(config.pagination.scroll_method)?;

        let max_attempts = if paginate { config.pagination.max_attempts } else { 0 };
        let mut scroll = ScrollState::new(max_attempts, config.pagination.stall_limit);
        let mut captures = Vec::new();
        let mut seen: Vec<TextRun> = Vec::new();

        let elements = loop {
            let tree = list.capture()?;
            let before = seen.len();
            seen = merge_snapshot(&seen, &message_runs(&tree));
            if scroll.attempts > 0 {
                scroll.record_growth(seen.len().saturating_sub(before));
            }
            log::info!(
                "[WX-EXPORT] capture {}: {} elements, {} messages seen",
                captures.len() + 1,
                tree.node_count(),
                seen.len()
            );
            captures.push(render_structure(&tree));

            if scroll.finished() {
                break tree.node_count();
            }
            let action = list.load_more()?;
            scroll.attempts += 1;
            log::info!(
                "[WX-EXPORT] load attempt {}/{}: {:?}",
                scroll.attempts,
                scroll.max_attempts,
                action
            );
            waits.page.settle();
        };
        if scroll.reached_top {
            log::info!("[WX-EXPORT] no new messages after {} loads, stopping", scroll.stalls);
        }

        let path = write_structure(&config.output.export_dir, &config.target.conversation, now, &captures)?;
        Ok(StructureSummary {
            conversation: config.target.conversation.clone(),
            path,
            captures: captures.len(),
            elements,
            attempts: scroll.attempts,
        })
    }
}

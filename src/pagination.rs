//! Pagination driver: load older history until the cutoff boundary is visible.
//!
//! The driver is a small state machine:
//!
//! ```text
//!   Scanning ──found──▶ Found
//!      │  ▲
//!  not │  │ settle
//! found▼  │
//!   LoadingMore ──attempt cap / top of history──▶ Exhausted
//!      │
//!      └──list inaccessible──▶ Failed
//! ```
//!
//! Every Scanning step snapshots the list, merges the snapshot into the
//! accumulated runs, and runs the boundary search on the fresh snapshot.
//! Exhaustion is a degraded success: the caller exports whatever was loaded
//! and records a warning. Failure aborts the run.

use std::thread;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::boundary::{locate_boundary, Boundary};
use crate::types::{ExportError, TextRun};

/// What a load-more step did to the host list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    /// Clicked the "查看更多消息" button
    ClickedLoadMore,
    /// Performed a scroll gesture
    Scrolled,
}

/// The paginated list the driver works on.
pub trait MessageList {
    /// Read the currently loaded rows.
    ///
    /// An error here means the list control is gone and is fatal for the run.
    fn snapshot(&mut self) -> Result<Vec<TextRun>, ExportError>;

    /// Ask the list to load older rows.
    fn load_more(&mut self) -> Result<LoadAction, ExportError>;
}

/// Wait strategy applied after each UI action.
pub trait Settle {
    fn settle(&self);
}

/// Sleep for a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Settle for FixedDelay {
    fn settle(&self) {
        thread::sleep(self.0);
    }
}

/// Do not wait at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Settle for Immediate {
    fn settle(&self) {}
}

/// Driver states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationState {
    Scanning,
    LoadingMore,
    Found(Boundary),
    Exhausted(ExhaustReason),
    Failed(String),
}

/// Why pagination stopped without finding the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The configured maximum number of load attempts was reached
    AttemptCap,
    /// Consecutive loads stopped producing new rows
    TopOfHistory,
}

impl ExhaustReason {
    pub fn describe(&self, attempts: u32) -> String {
        match self {
            ExhaustReason::AttemptCap => format!(
                "pagination stopped after {} attempts without reaching the start of the time window; the export may be incomplete",
                attempts
            ),
            ExhaustReason::TopOfHistory => format!(
                "reached the top of the loaded history after {} attempts without reaching the start of the time window; the export may be incomplete",
                attempts
            ),
        }
    }
}

/// Pagination bookkeeping for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollState {
    pub attempts: u32,
    pub max_attempts: u32,
    /// Consecutive loads that added no rows
    pub stalls: u32,
    pub stall_limit: u32,
    pub reached_top: bool,
}

impl ScrollState {
    pub fn new(max_attempts: u32, stall_limit: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            stalls: 0,
            stall_limit,
            reached_top: false,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// No further load should be attempted.
    pub fn finished(&self) -> bool {
        self.reached_top || self.exhausted()
    }

    /// Record how many new rows the last load produced.
    pub fn record_growth(&mut self, added: usize) {
        if added == 0 {
            self.stalls += 1;
            if self.stall_limit > 0 && self.stalls >= self.stall_limit {
                self.reached_top = true;
            }
        } else {
            self.stalls = 0;
        }
    }
}

/// Result of a pagination run that did not fail.
#[derive(Debug, Clone)]
pub struct PaginationOutcome {
    /// Found or Exhausted
    pub state: PaginationState,
    /// All rows seen, oldest first
    pub runs: Vec<TextRun>,
    pub attempts: u32,
}

impl PaginationOutcome {
    pub fn boundary(&self) -> Option<&Boundary> {
        match &self.state {
            PaginationState::Found(boundary) => Some(boundary),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<String> {
        match &self.state {
            PaginationState::Exhausted(reason) => Some(reason.describe(self.attempts)),
            _ => None,
        }
    }
}

/// Drives a [`MessageList`] until the boundary for `cutoff` is loaded.
pub struct PaginationDriver<'a, S: Settle> {
    settle: &'a S,
    scroll: ScrollState,
    state: PaginationState,
}

impl<'a, S: Settle> PaginationDriver<'a, S> {
    pub fn new(settle: &'a S, max_attempts: u32, stall_limit: u32) -> Self {
        Self {
            settle,
            scroll: ScrollState::new(max_attempts, stall_limit),
            state: PaginationState::Scanning,
        }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Run the state machine to a terminal state.
    ///
    /// With no cutoff (unbounded window) the driver keeps loading until it is
    /// exhausted, since every row is wanted.
    ///
    /// # Errors
    ///
    /// Returns the list's error when a snapshot or load step fails; the
    /// driver is then in `PaginationState::Failed`.
    pub fn run<L: MessageList>(
        &mut self,
        list: &mut L,
        cutoff: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Result<PaginationOutcome, ExportError> {
        let mut accumulated: Vec<TextRun> = Vec::new();

        loop {
            match self.state.clone() {
                PaginationState::Scanning => {
                    let snapshot = match list.snapshot() {
                        Ok(snapshot) => snapshot,
                        Err(e) => return Err(self.fail(e)),
                    };
                    let before = accumulated.len();
                    accumulated = merge_snapshot(&accumulated, &snapshot);
                    if self.scroll.attempts > 0 {
                        self.scroll.record_growth(accumulated.len().saturating_sub(before));
                    }
                    log::debug!(
                        "[WX-EXPORT] snapshot {}: {} lines visible, {} accumulated",
                        self.scroll.attempts,
                        snapshot.len(),
                        accumulated.len()
                    );

                    let boundary = cutoff.and_then(|cutoff| locate_boundary(&snapshot, cutoff, now));
                    self.state = if let Some(found) = boundary {
                        log::info!(
                            "[WX-EXPORT] found boundary '{}' ({}) after {} attempts",
                            found.text,
                            found.instant,
                            self.scroll.attempts
                        );
                        // The merge keeps the fresh snapshot's rows at their
                        // positions, so the index is valid in `accumulated`.
                        PaginationState::Found(found)
                    } else if self.scroll.reached_top {
                        PaginationState::Exhausted(ExhaustReason::TopOfHistory)
                    } else if self.scroll.exhausted() {
                        PaginationState::Exhausted(ExhaustReason::AttemptCap)
                    } else {
                        PaginationState::LoadingMore
                    };
                }
                PaginationState::LoadingMore => {
                    let action = match list.load_more() {
                        Ok(action) => action,
                        Err(e) => return Err(self.fail(e)),
                    };
                    self.scroll.attempts += 1;
                    log::info!(
                        "[WX-EXPORT] load attempt {}/{}: {:?}",
                        self.scroll.attempts,
                        self.scroll.max_attempts,
                        action
                    );
                    self.settle.settle();
                    self.state = PaginationState::Scanning;
                }
                PaginationState::Found(_) | PaginationState::Exhausted(_) => {
                    if let Some(warning) = self.warning() {
                        log::warn!("[WX-EXPORT] {}", warning);
                    }
                    return Ok(PaginationOutcome {
                        state: self.state.clone(),
                        runs: accumulated,
                        attempts: self.scroll.attempts,
                    });
                }
                PaginationState::Failed(reason) => {
                    return Err(ExportError::ListInaccessible(reason));
                }
            }
        }
    }

    fn warning(&self) -> Option<String> {
        match &self.state {
            PaginationState::Exhausted(reason) => Some(reason.describe(self.scroll.attempts)),
            _ => None,
        }
    }

    fn fail(&mut self, error: ExportError) -> ExportError {
        log::error!("[WX-EXPORT] pagination failed: {}", error);
        self.state = PaginationState::Failed(error.to_string());
        error
    }
}

/// Merge a fresh snapshot into the rows accumulated so far.
///
/// Older rows are prepended to the list as pagination proceeds, so the fresh
/// snapshot normally ends with (a prefix of) the accumulated rows. The merge
/// looks for the smallest offset `p` where `fresh[p..]` and `accumulated`
/// agree over their common length and returns `fresh[..p]` followed by the
/// longer tail. With no overlap at all the fresh rows are placed in front.
/// The result is re-indexed from zero.
///
/// # Example
///
/// ```
/// use wechat_exporter::pagination::merge_snapshot;
/// use wechat_exporter::TextRun;
///
/// let seen = TextRun::sequence(["10:00", "Alice", "hi"]);
/// let fresh = TextRun::sequence(["9:00", "Bob", "yo", "10:00", "Alice"]);
///
/// let merged: Vec<String> = merge_snapshot(&seen, &fresh).into_iter().map(|r| r.text).collect();
/// assert_eq!(merged, vec!["9:00", "Bob", "yo", "10:00", "Alice", "hi"]);
/// ```
pub fn merge_snapshot(accumulated: &[TextRun], fresh: &[TextRun]) -> Vec<TextRun> {
    if accumulated.is_empty() {
        return reindex(fresh.iter().cloned());
    }

    let agrees_at = |p: usize| {
        fresh[p..]
            .iter()
            .zip(accumulated)
            .all(|(a, b)| a.text == b.text)
    };

    let merged: Vec<TextRun> = match (0..fresh.len()).find(|&p| agrees_at(p)) {
        Some(p) => {
            let tail = if fresh.len() - p >= accumulated.len() {
                &fresh[p..]
            } else {
                accumulated
            };
            fresh[..p].iter().chain(tail).cloned().collect()
        }
        None => fresh.iter().chain(accumulated).cloned().collect(),
    };

    reindex(merged.into_iter())
}

fn reindex(runs: impl Iterator<Item = TextRun>) -> Vec<TextRun> {
    runs.enumerate()
        .map(|(index, run)| TextRun { index, ..run })
        .collect()
}

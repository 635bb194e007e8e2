//! WeChat Exporter - Export WeChat desktop chat history through UI Automation.
//!
//! The desktop client exposes its message list only as a UI tree of text
//! elements. This crate walks that tree, reconstructs the conversation and
//! writes a plain transcript for a time window.
//!
//! # Overview
//!
//! A run goes through these stages:
//!
//! 1. **Text-run extraction** ([`text_runs`]): depth-first walk of the message
//!    list, one [`TextRun`] per non-empty element text
//! 2. **Pagination** ([`pagination`]): load older history until the first
//!    timestamp at or before the window start is visible ([`boundary`])
//! 3. **Window filtering** ([`window`]): keep the sections inside the window
//! 4. **Classification** ([`classify`], [`timestamp`]): tag each line as
//!    timestamp, system notice, sender label or content
//! 5. **Deduplication** ([`dedup`]): drop repeated content
//! 6. **Export** ([`export`]): write the transcript file
//!
//! # Quick Start
//!
//! ```no_run
//! use wechat_exporter::config::{Config, Overrides};
//! use wechat_exporter::timestamp::SystemClock;
//! use wechat_exporter::ChatExporter;
//!
//! let config = Config::resolve(None, Overrides::default()).expect("valid configuration");
//! match ChatExporter::new(&config).run(&SystemClock) {
//!     Ok(summary) => println!("Wrote {}", summary.path.display()),
//!     Err(e) => eprintln!("Export failed: {}", e),
//! }
//! ```
//!
//! # Platform Support
//!
//! Only Windows has a UI Automation backend ([`platform`]). Everything else
//! is platform independent and works on any in-memory [`ui::UiElement`]
//! tree; elsewhere [`ChatExporter::run`] returns
//! [`ExportError::UnsupportedPlatform`].

pub mod boundary;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod export;
pub mod exporter;
pub mod logging;
pub mod pagination;
pub mod platform;
pub mod text_runs;
pub mod timestamp;
pub mod types;
pub mod ui;
pub mod window;

pub use exporter::ChatExporter;

pub use types::{
    ClassifiedLine, ExportError, ExportSummary, LineKind, StructureSummary, TextRun, UiError,
};

pub use config::{Config, ConfigError};
pub use dedup::Strictness;

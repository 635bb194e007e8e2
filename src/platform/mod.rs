//! Platform-specific UI automation backends.
//!
//! # Platform Support
//!
//! - **Windows**: UI Automation via the `uiautomation` crate, synthetic input
//!   via `SendInput`
//! - **Other platforms**: Not supported. [`ChatExporter`](crate::ChatExporter)
//!   returns `ExportError::UnsupportedPlatform`.
//!
//! # Conditional Compilation
//!
//! The Windows module is only compiled when targeting Windows
//! (`target_os = "windows"`), so its dependencies are not pulled in elsewhere.

/// Windows implementation of [`Desktop`](crate::ui::Desktop) and
/// [`UiElement`](crate::ui::UiElement).
#[cfg(target_os = "windows")]
pub mod windows;

//! Windows backend.
//!
//! The tree is read through the control view of UI Automation. Input goes
//! through `SendInput` to whatever window has the foreground, so callers
//! focus the target first.

mod element;
mod input;

pub use element::WindowsElement;

use std::rc::Rc;

use uiautomation::UIAutomation;

use crate::types::{ExportError, UiError};
use crate::ui::{Desktop, Key, Point};

/// Timeout for the top-level window lookup (ms).
const CONNECT_TIMEOUT_MS: u64 = 3000;

/// UI Automation client plus synthetic input.
pub struct WindowsDesktop {
    automation: UIAutomation,
}

impl WindowsDesktop {
    pub fn new() -> Result<Self, ExportError> {
        let automation = UIAutomation::new().map_err(|e| {
            ExportError::UnsupportedPlatform(format!("UI Automation unavailable: {}", e))
        })?;
        Ok(Self { automation })
    }
}

impl Desktop for WindowsDesktop {
    type Element = WindowsElement;

    fn connect(&self, window_class: &str) -> Result<WindowsElement, UiError> {
        let window = self
            .automation
            .create_matcher()
            .classname(window_class)
            .depth(2)
            .timeout(CONNECT_TIMEOUT_MS)
            .find_first()
            .map_err(|e| UiError::NotFound(format!("window class '{}': {}", window_class, e)))?;

        let walker = self
            .automation
            .get_control_view_walker()
            .map_err(|e| UiError::ElementUnavailable(format!("control view walker: {}", e)))?;

        Ok(WindowsElement::new(window, Rc::new(walker)))
    }

    fn press_key(&self, key: Key) -> Result<(), UiError> {
        input::press_key(key)
    }

    fn type_text(&self, text: &str) -> Result<(), UiError> {
        input::type_text(text)
    }

    fn mouse_move(&self, to: Point) -> Result<(), UiError> {
        input::mouse_move(to)
    }

    fn mouse_press(&self, at: Point) -> Result<(), UiError> {
        input::mouse_move(at)?;
        input::mouse_button(true)
    }

    fn mouse_release(&self, at: Point) -> Result<(), UiError> {
        input::mouse_move(at)?;
        input::mouse_button(false)
    }
}

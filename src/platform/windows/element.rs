//! [`UiElement`] over a UI Automation element.

use std::rc::Rc;

use uiautomation::controls::ControlType as UiaControlType;
use uiautomation::{UIElement, UITreeWalker};

use crate::types::UiError;
use crate::ui::{ControlType, Rect, UiElement};

/// A live element plus the walker used to enumerate its children.
#[derive(Clone)]
pub struct WindowsElement {
    element: UIElement,
    walker: Rc<UITreeWalker>,
}

impl WindowsElement {
    pub(crate) fn new(element: UIElement, walker: Rc<UITreeWalker>) -> Self {
        Self { element, walker }
    }
}

fn unavailable(what: &str, e: uiautomation::Error) -> UiError {
    UiError::ElementUnavailable(format!("{}: {}", what, e))
}

fn map_control_type(control_type: UiaControlType) -> ControlType {
    match control_type {
        UiaControlType::Window => ControlType::Window,
        UiaControlType::Pane => ControlType::Pane,
        UiaControlType::List => ControlType::List,
        UiaControlType::ListItem => ControlType::ListItem,
        UiaControlType::Button => ControlType::Button,
        UiaControlType::Text => ControlType::Text,
        UiaControlType::Edit => ControlType::Edit,
        UiaControlType::Image => ControlType::Image,
        other => ControlType::Other(format!("{:?}", other)),
    }
}

impl UiElement for WindowsElement {
    fn text(&self) -> Result<String, UiError> {
        self.element.get_name().map_err(|e| unavailable("name", e))
    }

    fn control_type(&self) -> Result<ControlType, UiError> {
        self.element
            .get_control_type()
            .map(map_control_type)
            .map_err(|e| unavailable("control type", e))
    }

    fn rect(&self) -> Result<Rect, UiError> {
        let rect = self
            .element
            .get_bounding_rectangle()
            .map_err(|e| unavailable("bounding rectangle", e))?;
        Ok(Rect::new(
            rect.get_left(),
            rect.get_top(),
            rect.get_right(),
            rect.get_bottom(),
        ))
    }

    fn class_name(&self) -> Result<String, UiError> {
        self.element
            .get_classname()
            .map_err(|e| unavailable("class name", e))
    }

    fn automation_id(&self) -> Result<String, UiError> {
        self.element
            .get_automation_id()
            .map_err(|e| unavailable("automation id", e))
    }

    fn is_visible(&self) -> Result<bool, UiError> {
        self.element
            .is_offscreen()
            .map(|offscreen| !offscreen)
            .map_err(|e| unavailable("offscreen state", e))
    }

    fn children(&self) -> Result<Vec<Self>, UiError> {
        let mut children = Vec::new();
        // The walker reports "no first child" as an error.
        let mut next = match self.walker.get_first_child(&self.element) {
            Ok(child) => Some(child),
            Err(_) => return Ok(children),
        };
        while let Some(child) = next {
            next = self.walker.get_next_sibling(&child).ok();
            children.push(WindowsElement::new(child, Rc::clone(&self.walker)));
        }
        Ok(children)
    }

    fn click(&self) -> Result<(), UiError> {
        self.element
            .click()
            .map_err(|e| UiError::InputFailed(format!("click: {}", e)))
    }

    fn focus(&self) -> Result<(), UiError> {
        self.element
            .set_focus()
            .map_err(|e| UiError::InputFailed(format!("focus: {}", e)))
    }
}

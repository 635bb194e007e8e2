//! UI-automation contract consumed by the exporter.
//!
//! The exporter never talks to a concrete automation backend directly. It is
//! written against two traits:
//!
//! - [`UiElement`]: one node of the host application's accessibility tree
//! - [`Desktop`]: connection to the host window plus synthetic input
//!
//! Every accessor may fail per call. Extraction never works on the live tree:
//! [`ElementNode::capture`] materializes a subtree into memory once, turning
//! each failed accessor into an absent value, and everything downstream is a
//! pure transformation over that snapshot.

use serde::{Deserialize, Serialize};

use crate::types::UiError;

/// Bounding rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.left + self.right) / 2,
            y: (self.top + self.bottom) / 2,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Screen coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Control types the exporter distinguishes.
///
/// Anything else is kept by name in `Other` so structure dumps stay faithful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlType {
    Window,
    Pane,
    List,
    ListItem,
    Button,
    Text,
    Edit,
    Image,
    Other(String),
    Unknown,
}

impl ControlType {
    /// Returns the display name used in structure dumps.
    ///
    /// # Examples
    ///
    /// ```
    /// use wechat_exporter::ui::ControlType;
    ///
    /// assert_eq!(ControlType::ListItem.as_str(), "ListItem");
    /// assert_eq!(ControlType::Other("Hyperlink".into()).as_str(), "Hyperlink");
    /// ```
    pub fn as_str(&self) -> &str {
        match self {
            ControlType::Window => "Window",
            ControlType::Pane => "Pane",
            ControlType::List => "List",
            ControlType::ListItem => "ListItem",
            ControlType::Button => "Button",
            ControlType::Text => "Text",
            ControlType::Edit => "Edit",
            ControlType::Image => "Image",
            ControlType::Other(name) => name,
            ControlType::Unknown => "Unknown",
        }
    }
}

/// Keys the exporter sends to the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    PageUp,
    /// Ctrl held together with an ASCII letter (e.g. `Ctrl('f')`)
    Ctrl(char),
}

/// One node of the host application's UI tree.
///
/// All accessors are fallible. Implementations must not panic: a failure is
/// reported as a [`UiError`] and the caller decides whether it is fatal.
pub trait UiElement: Sized {
    /// Window text (the UIA `Name` property)
    fn text(&self) -> Result<String, UiError>;

    fn control_type(&self) -> Result<ControlType, UiError>;

    fn rect(&self) -> Result<Rect, UiError>;

    fn class_name(&self) -> Result<String, UiError>;

    fn automation_id(&self) -> Result<String, UiError>;

    fn is_visible(&self) -> Result<bool, UiError>;

    /// Direct children in native order
    fn children(&self) -> Result<Vec<Self>, UiError>;

    fn click(&self) -> Result<(), UiError>;

    fn focus(&self) -> Result<(), UiError>;
}

/// Connection to the desktop: window lookup plus synthetic input.
pub trait Desktop {
    type Element: UiElement;

    /// Find the top-level window with the given class name.
    fn connect(&self, window_class: &str) -> Result<Self::Element, UiError>;

    fn press_key(&self, key: Key) -> Result<(), UiError>;

    /// Type arbitrary (including non-ASCII) text into the focused control.
    fn type_text(&self, text: &str) -> Result<(), UiError>;

    fn mouse_move(&self, to: Point) -> Result<(), UiError>;

    fn mouse_press(&self, at: Point) -> Result<(), UiError>;

    fn mouse_release(&self, at: Point) -> Result<(), UiError>;
}

/// In-memory copy of a UI subtree.
///
/// Produced by [`ElementNode::capture`]. Accessors that failed during the
/// capture are stored as `None` (or `ControlType::Unknown`), and a node whose
/// children could not be enumerated simply has none.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementNode {
    pub text: Option<String>,
    pub control_type: Option<ControlType>,
    pub rect: Option<Rect>,
    pub class_name: Option<String>,
    pub automation_id: Option<String>,
    pub visible: Option<bool>,
    pub children: Vec<ElementNode>,
}

impl ElementNode {
    /// Creates a node carrying only text, for building trees by hand.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a text-less node of the given control type.
    pub fn of_type(control_type: ControlType) -> Self {
        Self {
            control_type: Some(control_type),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Materialize a live subtree into memory.
    ///
    /// This is the only place extraction calls fallible element accessors.
    /// Each failure is logged at debug level and recorded as an absent value;
    /// a failed child enumeration yields an empty child list so siblings and
    /// ancestors are still captured.
    ///
    /// The root's child enumeration is the exception: if the root itself
    /// cannot list its children the whole control is considered inaccessible
    /// and the error is returned.
    pub fn capture<E: UiElement>(root: &E) -> Result<ElementNode, UiError> {
        let children = root.children()?;
        let mut node = Self::capture_properties(root);
        node.children = children.iter().map(|child| Self::capture_lenient(child, 1)).collect();
        Ok(node)
    }

    fn capture_lenient<E: UiElement>(element: &E, depth: usize) -> ElementNode {
        let mut node = Self::capture_properties(element);
        node.children = match element.children() {
            Ok(children) => children
                .iter()
                .map(|child| Self::capture_lenient(child, depth + 1))
                .collect(),
            Err(e) => {
                log::debug!("[WX-EXPORT] skipping children at depth {}: {}", depth, e);
                Vec::new()
            }
        };
        node
    }

    fn capture_properties<E: UiElement>(element: &E) -> ElementNode {
        ElementNode {
            text: absent_on_error("text", element.text()),
            control_type: absent_on_error("control type", element.control_type()),
            rect: absent_on_error("rectangle", element.rect()),
            class_name: absent_on_error("class name", element.class_name()),
            automation_id: absent_on_error("automation id", element.automation_id()),
            visible: absent_on_error("visibility", element.is_visible()),
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ElementNode::node_count).sum::<usize>()
    }
}

fn absent_on_error<T>(what: &str, result: Result<T, UiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("[WX-EXPORT] {} unavailable: {}", what, e);
            None
        }
    }
}

/// A captured snapshot is itself a (never failing) UI tree, which lets the
/// same traversal code run over live elements and over test fixtures.
impl UiElement for ElementNode {
    fn text(&self) -> Result<String, UiError> {
        Ok(self.text.clone().unwrap_or_default())
    }

    fn control_type(&self) -> Result<ControlType, UiError> {
        Ok(self.control_type.clone().unwrap_or(ControlType::Unknown))
    }

    fn rect(&self) -> Result<Rect, UiError> {
        self.rect
            .ok_or_else(|| UiError::ElementUnavailable("no rectangle captured".into()))
    }

    fn class_name(&self) -> Result<String, UiError> {
        Ok(self.class_name.clone().unwrap_or_default())
    }

    fn automation_id(&self) -> Result<String, UiError> {
        Ok(self.automation_id.clone().unwrap_or_default())
    }

    fn is_visible(&self) -> Result<bool, UiError> {
        Ok(self.visible.unwrap_or(true))
    }

    fn children(&self) -> Result<Vec<Self>, UiError> {
        Ok(self.children.clone())
    }

    fn click(&self) -> Result<(), UiError> {
        Err(UiError::Unsupported("snapshot nodes cannot be clicked".into()))
    }

    fn focus(&self) -> Result<(), UiError> {
        Err(UiError::Unsupported("snapshot nodes cannot be focused".into()))
    }
}

/// Render a captured subtree as an indented structure listing.
///
/// Each node produces one line `{indent}{control type} - '{text}'    {rect}`
/// followed, when either is known, by `{indent}['{class}', '{automation id}']`.
/// The indent is `"|    "` per level.
///
/// # Example
///
/// ```
/// use wechat_exporter::ui::{render_structure, ControlType, ElementNode, Rect};
///
/// let tree = ElementNode::of_type(ControlType::List)
///     .with_text("消息")
///     .with_rect(Rect::new(0, 0, 100, 200))
///     .with_children(vec![ElementNode::of_type(ControlType::ListItem).with_text("hi")]);
///
/// let lines = render_structure(&tree);
/// assert_eq!(lines[0], "List - '消息'    (0, 0, 100, 200)");
/// assert_eq!(lines[1], "|    ListItem - 'hi'    (Unknown position)");
/// ```
pub fn render_structure(root: &ElementNode) -> Vec<String> {
    let mut lines = Vec::new();
    render_recursive(root, 0, &mut lines);
    lines
}

fn render_recursive(node: &ElementNode, level: usize, lines: &mut Vec<String>) {
    let indent = "|    ".repeat(level);
    let control_type = node
        .control_type
        .as_ref()
        .map(ControlType::as_str)
        .unwrap_or("Unknown");
    let rect = node
        .rect
        .map(|r| format!("({}, {}, {}, {})", r.left, r.top, r.right, r.bottom))
        .unwrap_or_else(|| "(Unknown position)".to_string());

    lines.push(format!(
        "{}{} - '{}'    {}",
        indent,
        control_type,
        node.text.as_deref().unwrap_or(""),
        rect
    ));

    let class_name = node.class_name.as_deref().unwrap_or("");
    let automation_id = node.automation_id.as_deref().unwrap_or("");
    if !class_name.is_empty() || !automation_id.is_empty() {
        lines.push(format!("{}['{}', '{}']", indent, class_name, automation_id));
    }

    for child in &node.children {
        render_recursive(child, level + 1, lines);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FlakyElement;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(10, 20, 110, 220);
        assert_eq!(rect.center(), Point::new(60, 120));
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 200);
    }

    #[test]
    fn test_capture_records_failed_accessors_as_absent() {
        let root = FlakyElement::text("root").with_children(vec![
            FlakyElement::text("broken").failing_text(),
            FlakyElement::text("ok"),
        ]);

        let node = ElementNode::capture(&root).expect("root children are readable");
        assert_eq!(node.text.as_deref(), Some("root"));
        assert_eq!(node.rect, None);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].text, None);
        assert_eq!(node.children[1].text.as_deref(), Some("ok"));
    }

    #[test]
    fn test_capture_treats_failed_child_lookup_as_empty_subtree() {
        let root = FlakyElement::text("root").with_children(vec![
            FlakyElement::text("a")
                .with_children(vec![FlakyElement::text("hidden")])
                .failing_children(),
            FlakyElement::text("b").with_children(vec![FlakyElement::text("c")]),
        ]);

        let node = ElementNode::capture(&root).expect("root children are readable");
        assert!(node.children[0].children.is_empty());
        assert_eq!(node.children[1].children[0].text.as_deref(), Some("c"));
        assert_eq!(node.node_count(), 4);
    }

    #[test]
    fn test_capture_fails_when_root_is_inaccessible() {
        let root = FlakyElement::text("list").failing_children();
        assert!(ElementNode::capture(&root).is_err());
    }

    #[test]
    fn test_snapshot_recapture_is_identity() {
        let tree = ElementNode::of_type(ControlType::List).with_children(vec![
            ElementNode::of_type(ControlType::ListItem).with_text("Alice"),
            ElementNode::text("hello"),
        ]);
        let recaptured = ElementNode::capture(&tree).expect("snapshots never fail");
        assert_eq!(recaptured.children[0].text.as_deref(), Some("Alice"));
        assert_eq!(recaptured.children[1].text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_render_structure_nesting_and_ids() {
        let mut item = ElementNode::of_type(ControlType::ListItem).with_text("hello");
        item.class_name = Some("mmui::ChatBubble".to_string());

        let tree = ElementNode::of_type(ControlType::List)
            .with_text("消息")
            .with_children(vec![item.with_children(vec![ElementNode::of_type(
                ControlType::Button,
            )])]);

        assert_eq!(
            render_structure(&tree),
            vec![
                "List - '消息'    (Unknown position)".to_string(),
                "|    ListItem - 'hello'    (Unknown position)".to_string(),
                "|    ['mmui::ChatBubble', '']".to_string(),
                "|    |    Button - ''    (Unknown position)".to_string(),
            ]
        );
    }
}

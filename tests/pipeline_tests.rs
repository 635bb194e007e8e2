//! End-to-end export runs against an in-memory WeChat window.
//!
//! `FakeDesktop` serves a window whose message list reveals one more page of
//! history each time the load-more button is clicked or PageUp is pressed.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;

use wechat_exporter::config::{Config, ScrollMethod};
use wechat_exporter::exporter::{Waits, LOAD_MORE_TEXT, MESSAGE_LIST_NAME};
use wechat_exporter::timestamp::FixedClock;
use wechat_exporter::ui::{ControlType, Desktop, ElementNode, Key, Point, Rect, UiElement};
use wechat_exporter::{ChatExporter, ExportError, UiError};

const WINDOW_CLASS: &str = "WeChatMainWndForPC";
const LIST_RECT: Rect = Rect {
    left: 0,
    top: 0,
    right: 400,
    bottom: 800,
};
const BUTTON_RECT: Rect = Rect {
    left: 100,
    top: 10,
    right: 300,
    bottom: 40,
};

// ============================================================================
// Fake desktop
// ============================================================================

#[derive(Default)]
struct FakeChat {
    /// Newest page first
    pages: Vec<Vec<&'static str>>,
    loaded: usize,
    list_name: &'static str,
    has_list: bool,
    load_more_button: bool,
    keys: Vec<Key>,
    typed: Vec<String>,
    button_clicks: usize,
}

impl FakeChat {
    fn new(pages: Vec<Vec<&'static str>>) -> Self {
        Self {
            pages,
            loaded: 1,
            list_name: MESSAGE_LIST_NAME,
            has_list: true,
            ..Self::default()
        }
    }

    fn more_available(&self) -> bool {
        self.loaded < self.pages.len()
    }

    fn load_page(&mut self) {
        if self.more_available() {
            self.loaded += 1;
        }
    }

    fn visible_lines(&self) -> Vec<&'static str> {
        self.pages[..self.loaded.min(self.pages.len())]
            .iter()
            .rev()
            .flatten()
            .copied()
            .collect()
    }
}

#[derive(Clone)]
enum FakeElement {
    Window(Rc<RefCell<FakeChat>>),
    List(Rc<RefCell<FakeChat>>),
    Node(ElementNode),
}

impl UiElement for FakeElement {
    fn text(&self) -> Result<String, UiError> {
        match self {
            FakeElement::Window(_) => Ok("微信".to_string()),
            FakeElement::List(chat) => Ok(chat.borrow().list_name.to_string()),
            FakeElement::Node(node) => node.text(),
        }
    }

    fn control_type(&self) -> Result<ControlType, UiError> {
        match self {
            FakeElement::Window(_) => Ok(ControlType::Window),
            FakeElement::List(_) => Ok(ControlType::List),
            FakeElement::Node(node) => node.control_type(),
        }
    }

    fn rect(&self) -> Result<Rect, UiError> {
        match self {
            FakeElement::Window(_) | FakeElement::List(_) => Ok(LIST_RECT),
            FakeElement::Node(node) => node.rect(),
        }
    }

    fn class_name(&self) -> Result<String, UiError> {
        Ok(String::new())
    }

    fn automation_id(&self) -> Result<String, UiError> {
        Ok(String::new())
    }

    fn is_visible(&self) -> Result<bool, UiError> {
        Ok(true)
    }

    fn children(&self) -> Result<Vec<Self>, UiError> {
        match self {
            FakeElement::Window(chat) => {
                let mut children = vec![FakeElement::Node(
                    ElementNode::of_type(ControlType::Edit).with_text("搜索"),
                )];
                if chat.borrow().has_list {
                    children.push(FakeElement::List(Rc::clone(chat)));
                }
                Ok(children)
            }
            FakeElement::List(chat) => {
                let chat = chat.borrow();
                let mut children = Vec::new();
                if chat.load_more_button && chat.more_available() {
                    children.push(FakeElement::Node(
                        ElementNode::of_type(ControlType::Button)
                            .with_text(LOAD_MORE_TEXT)
                            .with_rect(BUTTON_RECT),
                    ));
                }
                children.extend(chat.visible_lines().into_iter().map(|line| {
                    FakeElement::Node(ElementNode::of_type(ControlType::ListItem).with_text(line))
                }));
                Ok(children)
            }
            FakeElement::Node(node) => Ok(node.children.iter().cloned().map(FakeElement::Node).collect()),
        }
    }

    fn click(&self) -> Result<(), UiError> {
        Err(UiError::Unsupported("click".into()))
    }

    fn focus(&self) -> Result<(), UiError> {
        Ok(())
    }
}

struct FakeDesktop {
    chat: Rc<RefCell<FakeChat>>,
}

impl FakeDesktop {
    fn new(chat: FakeChat) -> Self {
        Self {
            chat: Rc::new(RefCell::new(chat)),
        }
    }
}

fn inside(rect: Rect, point: Point) -> bool {
    (rect.left..=rect.right).contains(&point.x) && (rect.top..=rect.bottom).contains(&point.y)
}

impl Desktop for FakeDesktop {
    type Element = FakeElement;

    fn connect(&self, window_class: &str) -> Result<FakeElement, UiError> {
        if window_class == WINDOW_CLASS {
            Ok(FakeElement::Window(Rc::clone(&self.chat)))
        } else {
            Err(UiError::NotFound(window_class.to_string()))
        }
    }

    fn press_key(&self, key: Key) -> Result<(), UiError> {
        let mut chat = self.chat.borrow_mut();
        chat.keys.push(key);
        if key == Key::PageUp {
            chat.load_page();
        }
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), UiError> {
        self.chat.borrow_mut().typed.push(text.to_string());
        Ok(())
    }

    fn mouse_move(&self, _to: Point) -> Result<(), UiError> {
        Ok(())
    }

    fn mouse_press(&self, _at: Point) -> Result<(), UiError> {
        Ok(())
    }

    fn mouse_release(&self, at: Point) -> Result<(), UiError> {
        let mut chat = self.chat.borrow_mut();
        if chat.load_more_button && inside(BUTTON_RECT, at) {
            chat.button_clicks += 1;
            chat.load_page();
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn at(d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .unwrap()
}

fn config(export_dir: &Path) -> Config {
    let mut config = Config::default();
    config.target.conversation = "A旗舰船队".to_string();
    config.pagination.max_attempts = 5;
    config.pagination.stall_limit = 2;
    config.output.export_dir = export_dir.to_path_buf();
    config
}

fn body_lines(content: &str) -> Vec<&str> {
    content
        .split("\n\n")
        .skip(2)
        .filter(|line| !line.is_empty() && !line.starts_with("警告"))
        .collect()
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_reference_conversation_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.window.start = Some("2025-04-10 00:00".to_string());

    let desktop = FakeDesktop::new(FakeChat::new(vec![vec![
        "2025年4月10日 20:44",
        "Alice",
        "hello",
        "hello",
        "Bob",
        "hi",
    ]]));

    let summary = ChatExporter::new(&config)
        .export_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 23, 0)))
        .unwrap();

    let content = std::fs::read_to_string(&summary.path).unwrap();
    assert_eq!(
        body_lines(&content),
        vec!["2025年4月10日 20:44", "Alice", "hello", "Bob", "hi"]
    );
    assert!(content.starts_with("# A旗舰船队 聊天记录 - 2025-04-10 23:00\n\n"));
    assert!(content.contains("时间范围: 2025-04-10 00:00:00 至 2025-04-10 23:00:00"));
    assert_eq!(summary.line_count, 5);
    assert_eq!(summary.window_start, Some(at(10, 0, 0)));
}

#[test]
fn test_opening_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let desktop = FakeDesktop::new(FakeChat::new(vec![vec!["20:00", "Alice", "hi"]]));

    ChatExporter::new(&config(dir.path()))
        .export_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 21, 0)))
        .unwrap();

    let chat = desktop.chat.borrow();
    assert_eq!(chat.typed, vec!["A旗舰船队".to_string()]);
    assert_eq!(&chat.keys[..2], &[Key::Ctrl('f'), Key::Enter]);
}

#[test]
fn test_load_more_button_until_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.window.hours = 10;

    let mut chat = FakeChat::new(vec![
        vec!["18:00", "Alice", "evening"],
        vec!["12:00", "Bob", "noon"],
        vec!["2025年4月9日 22:00", "Carol", "late"],
        vec!["2025年4月8日 9:00", "Dave", "never loaded"],
    ]);
    chat.load_more_button = true;
    let desktop = FakeDesktop::new(chat);

    let summary = ChatExporter::new(&config)
        .export_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 20, 0)))
        .unwrap();

    assert!(summary.complete);
    assert!(summary.warning.is_none());
    assert_eq!(summary.attempts, 2);
    assert_eq!(desktop.chat.borrow().button_clicks, 2);
    assert_eq!(summary.window_start, Some(at(9, 22, 0)));

    let content = std::fs::read_to_string(&summary.path).unwrap();
    assert_eq!(
        body_lines(&content),
        vec![
            "2025年4月9日 22:00",
            "Carol",
            "late",
            "12:00",
            "Bob",
            "noon",
            "18:00",
            "Alice",
            "evening",
        ]
    );
    assert!(!content.contains(LOAD_MORE_TEXT));
}

#[test]
fn test_page_up_when_no_button() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.window.hours = 10;
    config.pagination.scroll_method = ScrollMethod::PageUp;

    let desktop = FakeDesktop::new(FakeChat::new(vec![
        vec!["18:00", "Alice", "evening"],
        vec!["9:00", "Bob", "morning"],
    ]));

    let summary = ChatExporter::new(&config)
        .export_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 20, 0)))
        .unwrap();

    assert!(summary.complete);
    let keys = desktop.chat.borrow().keys.clone();
    assert_eq!(keys.iter().filter(|k| **k == Key::PageUp).count(), 1);
}

#[test]
fn test_exhausted_history_still_exports_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let desktop = FakeDesktop::new(FakeChat::new(vec![vec!["20:00", "Alice", "hi"]]));

    let summary = ChatExporter::new(&config(dir.path()))
        .export_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 21, 0)))
        .unwrap();

    assert!(!summary.complete);
    assert!(summary.attempts <= 5);
    let warning = summary.warning.clone().unwrap();
    let content = std::fs::read_to_string(&summary.path).unwrap();
    assert!(content.contains(&format!("警告: {}", warning)));
    assert_eq!(body_lines(&content), vec!["20:00", "Alice", "hi"]);
}

#[test]
fn test_missing_window_is_fatal_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.target.window_class = "SomethingElse".to_string();
    let desktop = FakeDesktop::new(FakeChat::new(vec![vec!["20:00"]]));

    let result = ChatExporter::new(&config).export_with(
        &desktop,
        &Waits::immediate(),
        &FixedClock(at(10, 21, 0)),
    );

    assert!(matches!(result, Err(ExportError::WindowNotFound(_))));
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn test_missing_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut chat = FakeChat::new(vec![vec!["20:00"]]);
    chat.has_list = false;
    let desktop = FakeDesktop::new(chat);

    let result = ChatExporter::new(&config(dir.path())).export_with(
        &desktop,
        &Waits::immediate(),
        &FixedClock(at(10, 21, 0)),
    );

    assert!(matches!(result, Err(ExportError::ListNotFound(_))));
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn test_falls_back_to_first_visible_list() {
    let dir = tempfile::tempdir().unwrap();
    let mut chat = FakeChat::new(vec![vec!["20:00", "Alice", "hi"]]);
    chat.list_name = "Messages";
    let desktop = FakeDesktop::new(chat);

    let summary = ChatExporter::new(&config(dir.path()))
        .export_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 21, 0)))
        .unwrap();

    let content = std::fs::read_to_string(&summary.path).unwrap();
    assert_eq!(body_lines(&content), vec!["20:00", "Alice", "hi"]);
}

#[test]
fn test_same_second_runs_do_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let clock = FixedClock(at(10, 21, 0));

    let first_desktop = FakeDesktop::new(FakeChat::new(vec![vec!["20:00", "Alice", "hi"]]));
    let second_desktop = FakeDesktop::new(FakeChat::new(vec![vec!["20:00", "Alice", "hi"]]));
    let exporter = ChatExporter::new(&config);

    let first = exporter
        .export_with(&first_desktop, &Waits::immediate(), &clock)
        .unwrap();
    let second = exporter
        .export_with(&second_desktop, &Waits::immediate(), &clock)
        .unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(file_count(dir.path()), 2);
}

#[test]
fn test_dump_structure_writes_single_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut chat = FakeChat::new(vec![vec!["20:00", "Alice"], vec!["19:00"]]);
    chat.load_more_button = true;
    let desktop = FakeDesktop::new(chat);

    let summary = ChatExporter::new(&config(dir.path()))
        .dump_structure_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 21, 0)), false)
        .unwrap();

    assert_eq!(summary.captures, 1);
    assert_eq!(summary.attempts, 0);
    assert_eq!(summary.elements, 4);
    assert_eq!(
        summary.path.file_name().and_then(|n| n.to_str()),
        Some("A旗舰船队_structure_2025-04-10_21-00-00.md")
    );
    assert_eq!(
        std::fs::read_to_string(&summary.path).unwrap(),
        "# A旗舰船队 消息结构 - 2025-04-10 21:00\n\n\
         ## 快照 1\n\n\
         List - '消息'    (0, 0, 400, 800)\n\
         |    Button - '查看更多消息'    (100, 10, 300, 40)\n\
         |    ListItem - '20:00'    (Unknown position)\n\
         |    ListItem - 'Alice'    (Unknown position)\n\n"
    );
    assert_eq!(desktop.chat.borrow().button_clicks, 0);
}

#[test]
fn test_dump_structure_with_scroll_captures_each_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut chat = FakeChat::new(vec![
        vec!["20:00", "Alice"],
        vec!["19:00", "Bob"],
        vec!["18:00"],
    ]);
    chat.load_more_button = true;
    let desktop = FakeDesktop::new(chat);

    let summary = ChatExporter::new(&config(dir.path()))
        .dump_structure_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 21, 0)), true)
        .unwrap();

    // Two clicks load the older pages, then two PageUps add nothing and
    // the stall limit ends the dump.
    assert_eq!(desktop.chat.borrow().button_clicks, 2);
    assert_eq!(summary.attempts, 4);
    assert_eq!(summary.captures, 5);
    assert_eq!(summary.elements, 6);

    let content = std::fs::read_to_string(&summary.path).unwrap();
    assert_eq!(content.matches("## 快照 ").count(), 5);
    assert!(content.contains("## 快照 5\n"));
    assert!(!content.contains("## 快照 6"));
    assert_eq!(content.matches("ListItem - '18:00'").count(), 3);
    assert_eq!(file_count(dir.path()), 1);
}

#[test]
fn test_dump_structure_scroll_stops_at_attempt_cap() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.pagination.max_attempts = 2;
    let pages: Vec<Vec<&'static str>> = (0..10).map(|_| vec!["19:00", "Alice", "again"]).collect();
    let desktop = FakeDesktop::new(FakeChat::new(pages));

    let summary = ChatExporter::new(&config)
        .dump_structure_with(&desktop, &Waits::immediate(), &FixedClock(at(10, 21, 0)), true)
        .unwrap();

    assert_eq!(summary.attempts, 2);
    assert_eq!(summary.captures, 3);
    let page_ups = desktop.chat.borrow().keys.iter().filter(|k| **k == Key::PageUp).count();
    assert_eq!(page_ups, 2);
}

#[test]
fn test_dump_structure_without_window_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.target.window_class = "Missing".to_string();
    let desktop = FakeDesktop::new(FakeChat::new(vec![vec!["20:00"]]));

    let result = ChatExporter::new(&config).dump_structure_with(
        &desktop,
        &Waits::immediate(),
        &FixedClock(at(10, 21, 0)),
        true,
    );
    assert!(matches!(result, Err(ExportError::WindowNotFound(_))));
    assert_eq!(file_count(dir.path()), 0);
}

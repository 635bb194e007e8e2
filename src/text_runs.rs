//! Text-run extraction from a captured UI subtree.
//!
//! Walks an [`ElementNode`] depth-first in pre-order (parent before children,
//! siblings in native order) and yields one [`TextRun`] per element whose
//! trimmed text is non-empty. Elements without text still have their
//! children visited.

use crate::types::{TextRun, UiError};
use crate::ui::{ElementNode, UiElement};

/// Lazy pre-order iterator over the text of a captured subtree.
///
/// The iterator is finite and single-pass; create a new one from the
/// snapshot to walk it again.
pub struct TextRuns<'a> {
    stack: Vec<&'a ElementNode>,
    next_index: usize,
}

impl<'a> TextRuns<'a> {
    pub fn new(root: &'a ElementNode) -> Self {
        Self {
            stack: vec![root],
            next_index: 0,
        }
    }
}

impl<'a> Iterator for TextRuns<'a> {
    type Item = TextRun;

    fn next(&mut self) -> Option<TextRun> {
        while let Some(node) = self.stack.pop() {
            // Reverse so the first child is popped first.
            self.stack.extend(node.children.iter().rev());

            let text = node.text.as_deref().map(str::trim).unwrap_or("");
            if !text.is_empty() {
                let run = TextRun::new(self.next_index, text);
                self.next_index += 1;
                return Some(run);
            }
        }
        None
    }
}

/// Capture a live element and collect its text runs.
///
/// Per-node failures below the root are absorbed by the capture; only an
/// inaccessible root is reported.
///
/// # Example
///
/// ```
/// use wechat_exporter::text_runs::extract_text_runs;
/// use wechat_exporter::ui::ElementNode;
///
/// let list = ElementNode::default().with_children(vec![
///     ElementNode::text("10:00"),
///     ElementNode::default().with_children(vec![ElementNode::text("Alice")]),
///     ElementNode::text("   "),
/// ]);
///
/// let texts: Vec<String> = extract_text_runs(&list)
///     .unwrap()
///     .into_iter()
///     .map(|run| run.text)
///     .collect();
/// assert_eq!(texts, vec!["10:00", "Alice"]);
/// ```
pub fn extract_text_runs<E: UiElement>(root: &E) -> Result<Vec<TextRun>, UiError> {
    let snapshot = ElementNode::capture(root)?;
    Ok(TextRuns::new(&snapshot).collect())
}

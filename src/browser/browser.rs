use tracing::{debug, warn};

use crate::browser::event::{BrowserAction, BrowserEvent, type_for_key};
use crate::error::Result;
use crate::tree::chunk_node::ChunkNode;
use crate::tree::chunk_tree::ChunkTree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// A placeholder at `path` is waiting for its type.
    PickType { path: Vec<u64> },
}

/// One display line of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub depth: usize,
    pub path: Vec<u64>,
    pub label: String,
    pub focused: bool,
}

/// Cursor-driven view over a chunk tree.
///
/// The cursor is a path. It sits on the root only while the root has no
/// children; otherwise it addresses a node at depth one or deeper.
pub struct Browser<'a> {
    tree: ChunkTree<'a>,
    cursor: Vec<u64>,
    mode: Mode,
    status: Option<String>,
}

impl<'a> Browser<'a> {
    pub fn new(tree: ChunkTree<'a>) -> Self {
        let mut browser = Self {
            tree,
            cursor: Vec::new(),
            mode: Mode::Navigate,
            status: None,
        };

        if browser.tree.root().nr_children() > 0 {
            browser.move_cursor(vec![0]);
        } else {
            browser.tree.root_mut().set_focus(true);
        }
        browser
    }

    pub fn tree(&self) -> &ChunkTree<'a> {
        &self.tree
    }

    pub fn into_tree(self) -> ChunkTree<'a> {
        self.tree
    }

    pub fn cursor(&self) -> &[u64] {
        &self.cursor
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn focused(&self) -> Option<&ChunkNode<'a>> {
        self.tree.select(&self.cursor).ok()
    }

    pub fn handle_event(&mut self, event: BrowserEvent) -> BrowserAction {
        if event == BrowserEvent::Quit {
            return BrowserAction::Exit;
        }

        match self.mode.clone() {
            Mode::PickType { path } => self.handle_pick(event, &path),
            Mode::Navigate => self.handle_navigate(event),
        }
    }

    fn handle_navigate(&mut self, event: BrowserEvent) -> BrowserAction {
        match event {
            BrowserEvent::Up => {
                if let Some((last, parent)) = self.cursor.split_last() {
                    let mut next = parent.to_vec();
                    next.push(last.saturating_sub(1));
                    self.move_cursor(next);
                }
            }

            BrowserEvent::Down => {
                if let Some((last, parent)) = self.cursor.split_last() {
                    let siblings = self.tree.select(parent).map_or(0, ChunkNode::nr_children);
                    let mut next = parent.to_vec();
                    next.push((last + 1).min(siblings.saturating_sub(1)));
                    self.move_cursor(next);
                }
            }

            BrowserEvent::Left => {
                if self.cursor.len() > 1 {
                    let mut next = self.cursor.clone();
                    next.pop();
                    self.move_cursor(next);
                }
            }

            BrowserEvent::Right => {
                let descend = self
                    .focused()
                    .is_some_and(|node| node.chunk_type().is_set() && node.nr_children() > 0);
                if descend {
                    let mut next = self.cursor.clone();
                    next.push(0);
                    self.move_cursor(next);
                }
            }

            BrowserEvent::Insert => {
                let (parent, location) = match self.cursor.split_last() {
                    Some((last, parent)) => (parent.to_vec(), *last),
                    None => (Vec::new(), 0),
                };
                self.insert_placeholder(parent, location);
            }

            BrowserEvent::Append => {
                let parent = match self.cursor.split_last() {
                    Some((_, parent)) => parent.to_vec(),
                    None => Vec::new(),
                };
                let location = self.tree.select(&parent).map_or(0, ChunkNode::nr_children);
                self.insert_placeholder(parent, location);
            }

            BrowserEvent::InsertInto => {
                let parent = self.cursor.clone();
                self.insert_placeholder(parent, 0);
            }

            BrowserEvent::Save => {
                let bytes = self.tree.to_bytes();
                debug!(bytes = bytes.len(), "save requested");
                return BrowserAction::Save(bytes);
            }

            BrowserEvent::PickType(_) | BrowserEvent::Cancel | BrowserEvent::Quit => {}
        }

        BrowserAction::None
    }

    fn handle_pick(&mut self, event: BrowserEvent, path: &[u64]) -> BrowserAction {
        match event {
            BrowserEvent::PickType(key) => {
                let Some(chunk_type) = type_for_key(key) else {
                    self.set_status(format!("no type bound to '{key}'"));
                    return BrowserAction::None;
                };

                match self.tree.set_type(path, chunk_type) {
                    Ok(()) => {
                        self.set_status(format!("typed as {chunk_type}"));
                        self.mode = Mode::Navigate;
                    }
                    Err(e) => self.report(e),
                }
            }

            BrowserEvent::Cancel => {
                self.set_status("left untyped");
                self.mode = Mode::Navigate;
            }

            _ => {}
        }

        BrowserAction::None
    }

    fn insert_placeholder(&mut self, parent: Vec<u64>, location: u64) {
        // unfocus first: the focused node may shift to a new index
        self.clear_focus();

        let result = self.tree.insert_child(&parent, location).map(|_| ());
        match result {
            Ok(()) => {
                let mut path = parent;
                path.push(location);
                self.move_cursor(path.clone());

                self.mode = Mode::PickType { path };
                self.set_status("pick a type");
            }
            Err(e) => {
                let cursor = self.cursor.clone();
                self.move_cursor(cursor);
                self.report(e);
            }
        }
    }

    fn report(&mut self, error: crate::error::ChunkError) {
        warn!(%error, cursor = ?self.cursor, "edit rejected");
        self.status = Some(error.to_string());
    }

    fn clear_focus(&mut self) {
        if let Ok(node) = self.tree.select_mut(&self.cursor) {
            node.set_focus(false);
        }
    }

    fn move_cursor(&mut self, next: Vec<u64>) {
        self.clear_focus();
        self.cursor = next;
        if let Ok(node) = self.tree.select_mut(&self.cursor) {
            node.set_focus(true);
        }
    }

    /// Canonical byte offset of the focused node.
    pub fn cursor_offset(&self) -> Result<u64> {
        self.tree.layout_offset(&self.cursor)
    }

    /// Flattens the tree depth-first into display rows.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut path = Vec::new();
        push_rows(self.tree.root(), 0, &mut path, &mut rows);
        rows
    }
}

fn push_rows(node: &ChunkNode<'_>, depth: usize, path: &mut Vec<u64>, rows: &mut Vec<Row>) {
    rows.push(Row {
        depth,
        path: path.clone(),
        label: label(node),
        focused: node.is_focused(),
    });

    for (i, child) in node.children().iter().enumerate() {
        path.push(i as u64);
        push_rows(child, depth + 1, path, rows);
        path.pop();
    }
}

fn label(node: &ChunkNode<'_>) -> String {
    let chunk_type = node.chunk_type();
    if chunk_type.is_set() {
        format!("{} {} items", chunk_type.glyph(), node.nr_children())
    } else {
        format!("{}:{} {}", chunk_type.glyph(), node.nr_children(), chunk_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::chunk_type::ChunkType;
    use crate::test_support::NESTED;

    fn browser() -> Browser<'static> {
        Browser::new(ChunkTree::build(&NESTED).unwrap())
    }

    fn focused_paths(browser: &Browser<'_>) -> Vec<Vec<u64>> {
        browser.rows().into_iter().filter(|r| r.focused).map(|r| r.path).collect()
    }

    #[test]
    fn starts_on_first_child() {
        let b = browser();
        assert_eq!(b.cursor(), &[0]);
        assert_eq!(focused_paths(&b), vec![vec![0]]);
    }

    #[test]
    fn navigation_is_clamped() {
        let mut b = browser();
        b.handle_event(BrowserEvent::Up);
        assert_eq!(b.cursor(), &[0]);

        for _ in 0..10 {
            b.handle_event(BrowserEvent::Down);
        }
        assert_eq!(b.cursor(), &[3]);

        b.handle_event(BrowserEvent::Left);
        assert_eq!(b.cursor(), &[3]);

        // scalars cannot be entered
        b.handle_event(BrowserEvent::Right);
        assert_eq!(b.cursor(), &[3]);
    }

    #[test]
    fn descend_and_return() {
        let mut b = browser();
        b.handle_event(BrowserEvent::Down);
        b.handle_event(BrowserEvent::Right);
        b.handle_event(BrowserEvent::Down);
        assert_eq!(b.cursor(), &[1, 1]);
        assert_eq!(b.cursor_offset().unwrap(), 24);
        assert_eq!(b.focused().unwrap().chunk_type(), ChunkType::UInt8);

        b.handle_event(BrowserEvent::Left);
        assert_eq!(b.cursor(), &[1]);
        assert_eq!(focused_paths(&b), vec![vec![1]]);
    }

    #[test]
    fn insert_then_pick_type() {
        let mut b = browser();
        b.handle_event(BrowserEvent::Down);
        b.handle_event(BrowserEvent::Down);
        b.handle_event(BrowserEvent::Insert);

        assert_eq!(b.cursor(), &[2]);
        assert_eq!(b.mode(), &Mode::PickType { path: vec![2] });
        assert_eq!(b.tree().root().nr_children(), 5);
        assert_eq!(b.tree().select(&[3]).unwrap().chunk_type(), ChunkType::UInt16);

        // navigation keys are ignored until a type is picked
        b.handle_event(BrowserEvent::Down);
        assert_eq!(b.cursor(), &[2]);

        b.handle_event(BrowserEvent::PickType('z'));
        assert!(matches!(b.mode(), Mode::PickType { .. }));

        b.handle_event(BrowserEvent::PickType('s'));
        assert_eq!(b.mode(), &Mode::Navigate);
        assert_eq!(b.tree().select(&[2]).unwrap().chunk_type(), ChunkType::Utf8);
        assert_eq!(focused_paths(&b), vec![vec![2]]);
    }

    #[test]
    fn cancel_leaves_placeholder() {
        let mut b = browser();
        b.handle_event(BrowserEvent::Append);
        assert_eq!(b.cursor(), &[4]);
        b.handle_event(BrowserEvent::Cancel);
        assert_eq!(b.mode(), &Mode::Navigate);
        assert_eq!(b.tree().select(&[4]).unwrap().chunk_type(), ChunkType::Undef);
    }

    #[test]
    fn insert_into_scalar_reports_and_keeps_tree() {
        let mut b = browser();
        let before = b.tree().to_bytes();
        b.handle_event(BrowserEvent::InsertInto);
        assert_eq!(b.mode(), &Mode::Navigate);
        assert!(b.status().is_some());
        assert_eq!(b.tree().to_bytes(), before);
    }

    #[test]
    fn build_a_set_from_scratch() {
        let mut b = browser();
        b.handle_event(BrowserEvent::Append);
        b.handle_event(BrowserEvent::PickType('['));
        b.handle_event(BrowserEvent::InsertInto);
        b.handle_event(BrowserEvent::PickType('5'));
        assert_eq!(b.cursor(), &[4, 0]);

        let BrowserAction::Save(bytes) = b.handle_event(BrowserEvent::Save) else {
            panic!("expected save");
        };
        let reloaded = ChunkTree::build(&bytes).unwrap();
        assert_eq!(reloaded.select(&[4, 0]).unwrap().chunk_type(), ChunkType::UInt32);
    }

    #[test]
    fn quit_works_in_any_mode() {
        let mut b = browser();
        b.handle_event(BrowserEvent::Insert);
        assert_eq!(b.handle_event(BrowserEvent::Quit), BrowserAction::Exit);
    }

    #[test]
    fn empty_root_set() {
        let tree = ChunkTree::build(&[0x8d, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        let mut b = Browser::new(tree);
        assert!(b.cursor().is_empty());

        b.handle_event(BrowserEvent::Insert);
        assert_eq!(b.cursor(), &[0]);
        assert_eq!(b.tree().root().nr_children(), 1);
    }

    #[test]
    fn rows_label_types() {
        let b = browser();
        let labels: Vec<String> = b.rows().into_iter().map(|r| r.label).collect();
        assert_eq!(labels[0], "[ 4 items");
        assert_eq!(labels[3], "I:0 uint32");
        assert_eq!(labels[4], "I:1 uint8");
    }
}

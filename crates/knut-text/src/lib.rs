//! Position-stable text buffer: the in-memory editable core shared by every
//! typed document. A buffer is a `String` plus a line-start index (not a
//! rope — this engine edits one file at a time under script control, not a
//! scrolling viewport, so the simpler representation keeps the mark-shift
//! arithmetic in `mark` easy to audit). Marks and range marks are handles
//! that survive arbitrary edits; undo is a coarse snapshot stack.

pub mod find;
pub mod mark;
pub mod undo;

use std::rc::Rc;

pub use find::{FindOptions, PreserveCase};
pub use mark::{DocumentToken, Mark, RangeMark};
pub use undo::{TabSettings, UndoEngine};

use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TextError {
    #[error("position {0} is out of bounds for a buffer of length {1}")]
    OutOfBounds(usize, usize),
    #[error("mark belongs to a different document")]
    ForeignMark,
    #[error("invalid regular expression: {0}")]
    BadRegex(String),
}

pub type Result<T> = std::result::Result<T, TextError>;

/// A byte offset into a buffer's content. 0-based internally; every public
/// line/column accessor converts to the 1-based convention used at the
/// script boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position(pub usize);

impl Position {
    pub fn offset(self) -> usize {
        self.0
    }
}

/// `(line, column)`, both 1-based, as exposed to scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// The cursor: a position plus an anchor. Equal when there is no selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub position: Position,
    pub anchor: Position,
}

impl Cursor {
    pub fn collapsed(pos: Position) -> Self {
        Self { position: pos, anchor: pos }
    }

    pub fn selection_start(&self) -> Position {
        self.position.min(self.anchor)
    }

    pub fn selection_end(&self) -> Position {
        self.position.max(self.anchor)
    }

    pub fn has_selection(&self) -> bool {
        self.position != self.anchor
    }
}

/// In-memory mutable text plus the cursor/selection and the set of marks
/// that must be kept stable across edits (§3 TextBuffer / Mark).
pub struct TextBuffer {
    content: String,
    line_starts: Vec<usize>,
    cursor: Cursor,
    token: Rc<DocumentToken>,
    mark_registry: mark::MarkRegistry,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::from_str("")
    }

    pub fn from_str(text: &str) -> Self {
        let mut buf = Self {
            content: String::new(),
            line_starts: vec![0],
            cursor: Cursor::collapsed(Position(0)),
            token: Rc::new(DocumentToken),
            mark_registry: mark::MarkRegistry::default(),
        };
        buf.set_text(text);
        buf
    }

    /// Stable handle to this buffer's identity, used by `Mark::is_valid`.
    pub fn token(&self) -> Rc<DocumentToken> {
        self.token.clone()
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor.position = self.clamp(cursor.position);
        self.cursor.anchor = self.clamp(cursor.anchor);
    }

    pub fn clamp(&self, pos: Position) -> Position {
        Position(pos.0.min(self.content.len()))
    }

    fn set_text(&mut self, text: &str) {
        self.content = text.to_string();
        self.reindex();
    }

    fn reindex(&mut self) {
        self.line_starts.clear();
        self.line_starts.push(0);
        for (i, b) in self.content.as_bytes().iter().enumerate() {
            if *b == b'\n' {
                self.line_starts.push(i + 1);
            }
        }
    }

    /// 0-based line index containing `pos`.
    pub fn line_at(&self, pos: Position) -> usize {
        match self.line_starts.binary_search(&pos.0) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        }
    }

    pub fn line_start(&self, line: usize) -> Position {
        Position(self.line_starts.get(line).copied().unwrap_or(self.content.len()))
    }

    pub fn line_end(&self, line: usize) -> Position {
        let next = self.line_starts.get(line + 1).copied().unwrap_or(self.content.len());
        if next > self.line_start(line).0 && self.content.as_bytes().get(next.saturating_sub(1)) == Some(&b'\n') {
            Position(next - 1)
        } else {
            Position(next)
        }
    }

    pub fn line_text(&self, line: usize) -> &str {
        let start = self.line_start(line).0;
        let end = self.line_end(line).0;
        &self.content[start..end]
    }

    pub fn position_to_line_column(&self, pos: Position) -> LineColumn {
        let line = self.line_at(pos);
        let start = self.line_start(line).0;
        let column = self.content[start..pos.0].graphemes(true).count();
        LineColumn { line: line + 1, column: column + 1 }
    }

    pub fn line_column_to_position(&self, lc: LineColumn) -> Position {
        let line = lc.line.saturating_sub(1).min(self.line_count().saturating_sub(1));
        let text = self.line_text(line);
        let start = self.line_start(line).0;
        let mut col = 0usize;
        let mut offset = text.len();
        for (i, _g) in text.grapheme_indices(true) {
            if col + 1 == lc.column {
                offset = i;
                break;
            }
            col += 1;
        }
        if lc.column <= 1 {
            offset = 0;
        }
        Position(start + offset)
    }

    // --- navigation -----------------------------------------------------

    pub fn start_of_line(&self, pos: Position) -> Position {
        self.line_start(self.line_at(pos))
    }

    pub fn end_of_line(&self, pos: Position) -> Position {
        self.line_end(self.line_at(pos))
    }

    pub fn start_of_document(&self) -> Position {
        Position(0)
    }

    pub fn end_of_document(&self) -> Position {
        Position(self.content.len())
    }

    pub fn next_char(&self, pos: Position, count: usize) -> Position {
        let mut p = pos.0;
        for g in self.content[pos.0..].graphemes(true).take(count) {
            p += g.len();
        }
        Position(p.min(self.content.len()))
    }

    pub fn previous_char(&self, pos: Position, count: usize) -> Position {
        let mut boundaries: Vec<usize> = self.content[..pos.0].grapheme_indices(true).map(|(i, _)| i).collect();
        boundaries.push(pos.0);
        let idx = boundaries.len().saturating_sub(1 + count);
        Position(boundaries.get(idx).copied().unwrap_or(0))
    }

    pub fn next_word(&self, pos: Position, count: usize) -> Position {
        let mut p = pos.0;
        for _ in 0..count {
            let rest = &self.content[p..];
            let mut advanced = false;
            for (i, w) in rest.split_word_bound_indices() {
                if i == 0 {
                    continue;
                }
                if !w.chars().next().map(|c| c.is_whitespace()).unwrap_or(true) {
                    p += i;
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                p = self.content.len();
            }
        }
        Position(p)
    }

    pub fn previous_word(&self, pos: Position, count: usize) -> Position {
        let mut p = pos.0;
        for _ in 0..count {
            let head = &self.content[..p];
            let bounds: Vec<(usize, &str)> = head.split_word_bound_indices().collect();
            let mut target = 0;
            for (i, w) in bounds.iter().rev() {
                if *i < p && !w.chars().next().map(|c| c.is_whitespace()).unwrap_or(true) {
                    target = *i;
                    break;
                }
            }
            p = target;
        }
        Position(p)
    }

    pub fn next_line(&self, pos: Position, count: usize) -> Position {
        let line = (self.line_at(pos) + count).min(self.line_count() - 1);
        let lc = self.position_to_line_column(pos);
        self.line_column_to_position(LineColumn { line: line + 1, column: lc.column })
    }

    pub fn previous_line(&self, pos: Position, count: usize) -> Position {
        let line = self.line_at(pos).saturating_sub(count);
        let lc = self.position_to_line_column(pos);
        self.line_column_to_position(LineColumn { line: line + 1, column: lc.column })
    }

    // --- mutation ---------------------------------------------------------

    /// Inserts `text` at `at`, shifting every live mark per the §3 rule, and
    /// returns the end position of the inserted text.
    pub fn insert_at_position(&mut self, at: Position, text: &str) -> Position {
        let at = self.clamp(at).0;
        self.content.insert_str(at, text);
        self.reindex();
        self.mark_registry.notify_change(at, 0, text.len());
        Position(at + text.len())
    }

    pub fn insert(&mut self, text: &str) -> Position {
        let pos = self.cursor.position;
        let end = self.insert_at_position(pos, text);
        self.cursor = Cursor::collapsed(end);
        end
    }

    pub fn insert_at_line(&mut self, line: usize, text: &str) -> Position {
        let at = self.line_start(line);
        self.insert_at_position(at, text)
    }

    /// Deletes `[start,end)` and returns the removed text.
    pub fn delete_range(&mut self, start: Position, end: Position) -> String {
        let (start, end) = (start.0.min(end.0), start.0.max(end.0));
        let (start, end) = (start.min(self.content.len()), end.min(self.content.len()));
        let removed = self.content[start..end].to_string();
        self.content.replace_range(start..end, "");
        self.reindex();
        self.mark_registry.notify_change(start, removed.len(), 0);
        let clamped = self.clamp(Position(start));
        self.cursor = Cursor::collapsed(clamped);
        removed
    }

    pub fn delete_selection(&mut self) -> String {
        let (s, e) = (self.cursor.selection_start(), self.cursor.selection_end());
        self.delete_range(s, e)
    }

    pub fn delete_next_char(&mut self, count: usize) -> String {
        let pos = self.cursor.position;
        let end = self.next_char(pos, count);
        self.delete_range(pos, end)
    }

    pub fn delete_previous_char(&mut self, count: usize) -> String {
        let pos = self.cursor.position;
        let start = self.previous_char(pos, count);
        self.delete_range(start, pos)
    }

    pub fn delete_next_word(&mut self, count: usize) -> String {
        let pos = self.cursor.position;
        let end = self.next_word(pos, count);
        self.delete_range(pos, end)
    }

    pub fn delete_previous_word(&mut self, count: usize) -> String {
        let pos = self.cursor.position;
        let start = self.previous_word(pos, count);
        self.delete_range(start, pos)
    }

    pub fn delete_start_of_line(&mut self) -> String {
        let pos = self.cursor.position;
        let start = self.start_of_line(pos);
        self.delete_range(start, pos)
    }

    pub fn delete_end_of_line(&mut self) -> String {
        let pos = self.cursor.position;
        let end = self.end_of_line(pos);
        self.delete_range(pos, end)
    }

    pub fn delete_line(&mut self, line: usize) -> String {
        let start = self.line_start(line);
        let next_start = Position(self.line_starts.get(line + 1).copied().unwrap_or(self.content.len()));
        self.delete_range(start, next_start)
    }

    pub fn replace_range(&mut self, start: Position, end: Position, text: &str) -> String {
        let removed = self.delete_range(start, end);
        self.insert_at_position(start, text);
        removed
    }

    /// Replaces the entire content with `text`, reporting the change to
    /// every live mark like any other edit, but keeping this buffer's
    /// identity token and mark registry — unlike `*buffer = TextBuffer::from_str(text)`,
    /// marks created before the call stay valid. Used by undo/redo (§3 Mark),
    /// which conceptually edits the same document rather than replacing it.
    pub fn restore_content(&mut self, text: &str, cursor: Cursor) {
        let old = self.content.clone();
        let prefix = old.as_bytes().iter().zip(text.as_bytes()).take_while(|(a, b)| a == b).count();
        let old_rest = &old[prefix..];
        let new_rest = &text[prefix..];
        let suffix = old_rest.as_bytes().iter().rev().zip(new_rest.as_bytes().iter().rev()).take_while(|(a, b)| a == b).count().min(old_rest.len()).min(new_rest.len());
        let removed = old_rest.len() - suffix;
        let added = new_rest.len() - suffix;
        self.set_text(text);
        self.mark_registry.notify_change(prefix, removed, added);
        self.set_cursor(cursor);
    }

    // --- indent -----------------------------------------------------------

    /// `indent(+n)`/`remove_indent(n)`: prepend or strip `|n|` tab units on
    /// every line touched by the current selection (or the cursor's line if
    /// there is none). A negative `n` here means "remove".
    pub fn indent(&mut self, n: i32, settings: &TabSettings) {
        if n == 0 {
            return;
        }
        let (start, end) = if self.cursor.has_selection() {
            (self.cursor.selection_start(), self.cursor.selection_end())
        } else {
            (self.cursor.position, self.cursor.position)
        };
        let first_line = self.line_at(start);
        let last_line = self.line_at(end);
        let unit = settings.unit();
        if n > 0 {
            for line in first_line..=last_line {
                if self.line_text(line).is_empty() {
                    continue;
                }
                let at = self.line_start(line);
                for _ in 0..n {
                    self.insert_at_position(at, &unit);
                }
            }
        } else {
            for line in first_line..=last_line {
                let text = self.line_text(line).to_string();
                let start_of = self.line_start(line);
                let mut removed_units = 0i32;
                let mut byte = 0usize;
                while removed_units < -n {
                    if text[byte..].starts_with('\t') {
                        byte += 1;
                    } else if text[byte..].starts_with(&" ".repeat(settings.tab_size)) {
                        byte += settings.tab_size;
                    } else if text[byte..].starts_with(' ') {
                        byte += 1;
                    } else {
                        break;
                    }
                    removed_units += 1;
                }
                if byte > 0 {
                    self.delete_range(start_of, Position(start_of.0 + byte));
                }
            }
        }
    }

    pub fn remove_indent(&mut self, n: i32, settings: &TabSettings) {
        self.indent(-n, settings);
    }

    // --- marks --------------------------------------------------------------

    pub fn create_mark(&mut self, pos: Position) -> Mark {
        self.mark_registry.create(&self.token, pos.0)
    }

    pub fn create_range_mark(&mut self, start: Position, end: Position) -> RangeMark {
        if start == end {
            tracing::warn!(target: "text.mark", pos = start.0, "creating empty range mark");
        }
        let start_mark = self.create_mark(start);
        let end_mark = self.create_mark(end);
        RangeMark::new(start_mark, end_mark)
    }

    /// Moves the cursor to a mark owned by this buffer. A mark from a
    /// different document is a logged error and a no-op (§4.A Failure).
    pub fn goto_mark(&mut self, mark: &Mark) -> Result<()> {
        if !mark.belongs_to(&self.token) {
            tracing::error!(target: "text.mark", "goto_mark called with a mark from a different document");
            return Err(TextError::ForeignMark);
        }
        if let Some(pos) = mark.position() {
            self.cursor = Cursor::collapsed(self.clamp(Position(pos)));
        }
        Ok(())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_shift_rules_match_spec_scenario() {
        let mut buf = TextBuffer::from_str(&"x".repeat(20));
        let mark = buf.create_mark(Position(10));
        buf.insert_at_position(Position(5), "abc");
        assert_eq!(mark.position(), Some(13));
        buf.delete_range(Position(5), Position(7));
        assert_eq!(mark.position(), Some(11));
        buf.delete_range(Position(9), Position(12));
        assert_eq!(mark.position(), Some(9));
    }

    #[test]
    fn mark_invalid_after_document_dropped() {
        let mark = {
            let mut buf = TextBuffer::from_str("hello");
            buf.create_mark(Position(2))
        };
        assert!(!mark.is_valid());
        assert_eq!(mark.position(), None);
    }

    #[test]
    fn range_mark_contains() {
        let mut buf = TextBuffer::from_str("0123456789");
        let rm = buf.create_range_mark(Position(2), Position(5));
        assert!(rm.contains(Position(2)));
        assert!(rm.contains(Position(4)));
        assert!(!rm.contains(Position(5)));
    }

    #[test]
    fn indent_then_remove_indent_round_trips() {
        let settings = TabSettings { insert_spaces: true, tab_size: 4 };
        let mut buf = TextBuffer::from_str("a\nb\nc\n");
        let end = buf.end_of_document();
        buf.set_cursor(Cursor { position: Position(0), anchor: end });
        buf.indent(2, &settings);
        let after_indent = buf.text().to_string();
        let end = buf.end_of_document();
        buf.set_cursor(Cursor { position: Position(0), anchor: end });
        buf.remove_indent(2, &settings);
        assert_eq!(buf.text(), "a\nb\nc\n");
        assert_ne!(after_indent, "a\nb\nc\n");
    }

    #[test]
    fn line_column_round_trip() {
        let buf = TextBuffer::from_str("first\nsecond\nthird");
        let lc = buf.position_to_line_column(Position(7));
        assert_eq!(lc, LineColumn { line: 2, column: 2 });
        let pos = buf.line_column_to_position(lc);
        assert_eq!(pos, Position(7));
    }

    #[test]
    fn restore_content_keeps_marks_valid_and_reshifts_them() {
        let mut buf = TextBuffer::from_str("hello world");
        let mark = buf.create_mark(Position(8));
        let token_before = buf.token();
        buf.restore_content("hello there, world", Cursor::collapsed(Position(0)));
        assert!(mark.is_valid());
        assert!(Rc::ptr_eq(&token_before, &buf.token()));
        assert_eq!(buf.text(), "hello there, world");
    }

    #[test]
    fn delete_selection_removes_text_and_returns_it() {
        let mut buf = TextBuffer::from_str("hello world");
        buf.set_cursor(Cursor { position: Position(0), anchor: Position(5) });
        let removed = buf.delete_selection();
        assert_eq!(removed, "hello");
        assert_eq!(buf.text(), " world");
    }
}

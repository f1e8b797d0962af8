//! Undo/redo (§4.A Undo): a coarse whole-buffer snapshot stack with
//! content-hash dedup and a coalescing discipline for runs of the same named
//! API call, adapted from the donor editor's `UndoEngine` — generalized from
//! "insert-mode coalescing" to "any two consecutive calls to the same named
//! API logged with the `merge` flag".

use crate::{Cursor, TextBuffer};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

pub const UNDO_HISTORY_MAX: usize = 200;

/// `TabSettings = { insert_spaces, tab_size }` (§4.A Indent), sourced from
/// Settings `/text_editor/tab`.
#[derive(Debug, Clone, Copy)]
pub struct TabSettings {
    pub insert_spaces: bool,
    pub tab_size: usize,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self { insert_spaces: true, tab_size: 4 }
    }
}

impl TabSettings {
    pub fn unit(&self) -> String {
        if self.insert_spaces { " ".repeat(self.tab_size) } else { "\t".to_string() }
    }
}

struct Snapshot {
    text: String,
    cursor: Cursor,
    hash: u64,
}

/// A run of merge-eligible edits under the same API name, open until a
/// differently-named call arrives or `end_merge_run` is called explicitly.
enum MergeRun {
    Inactive,
    Active { name: &'static str },
}

pub struct UndoEngine {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    merge_run: MergeRun,
    skipped: AtomicU64,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self { undo_stack: Vec::new(), redo_stack: Vec::new(), merge_run: MergeRun::Inactive, skipped: AtomicU64::new(0) }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn snapshots_skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Records a snapshot of `buffer` *before* applying the call named
    /// `call_name`. When `merge` is true and the previous pushed snapshot was
    /// also taken for `call_name`, no new snapshot is pushed — the edit joins
    /// the existing undo step.
    pub fn record(&mut self, call_name: &'static str, merge: bool, buffer: &TextBuffer) {
        if merge {
            if let MergeRun::Active { name } = self.merge_run {
                if name == call_name {
                    return;
                }
            }
        }
        self.push_snapshot(buffer);
        self.merge_run = if merge { MergeRun::Active { name: call_name } } else { MergeRun::Inactive };
    }

    pub fn end_merge_run(&mut self) {
        self.merge_run = MergeRun::Inactive;
    }

    fn push_snapshot(&mut self, buffer: &TextBuffer) {
        let hash = text_hash(buffer.text());
        if let Some(last) = self.undo_stack.last() {
            if last.hash == hash {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                trace!(target: "text.undo", hash, "snapshot_dedupe_skip");
                return;
            }
        }
        self.undo_stack.push(Snapshot { text: buffer.text().to_string(), cursor: buffer.cursor(), hash });
        trace!(target: "text.undo", undo_depth = self.undo_stack.len(), "push_snapshot");
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, buffer: &mut TextBuffer) -> bool {
        let Some(previous) = self.undo_stack.pop() else { return false };
        self.redo_stack.push(Snapshot { text: buffer.text().to_string(), cursor: buffer.cursor(), hash: text_hash(buffer.text()) });
        // `restore_content` keeps this buffer's identity token alive, so
        // marks taken before the undo stay valid — undoing is still an edit
        // to the same document, not a replacement of it.
        buffer.restore_content(&previous.text, previous.cursor);
        self.merge_run = MergeRun::Inactive;
        true
    }

    pub fn redo(&mut self, buffer: &mut TextBuffer) -> bool {
        let Some(next) = self.redo_stack.pop() else { return false };
        self.undo_stack.push(Snapshot { text: buffer.text().to_string(), cursor: buffer.cursor(), hash: text_hash(buffer.text()) });
        buffer.restore_content(&next.text, next.cursor);
        self.merge_run = MergeRun::Inactive;
        true
    }
}

fn text_hash(text: &str) -> u64 {
    let mut h = DefaultHasher::new();
    h.write(text.as_bytes());
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn undo_restores_previous_text() {
        let mut buf = TextBuffer::from_str("hello");
        let mut engine = UndoEngine::new();
        engine.record("insert", false, &buf);
        buf.insert_at_position(Position(5), " world");
        assert_eq!(buf.text(), "hello world");
        assert!(engine.undo(&mut buf));
        assert_eq!(buf.text(), "hello");
    }

    #[test]
    fn consecutive_merge_calls_collapse_into_one_step() {
        let mut buf = TextBuffer::from_str("");
        let mut engine = UndoEngine::new();
        for ch in ["a", "b", "c"] {
            engine.record("insert", true, &buf);
            buf.insert_at_position(buf.end_of_document(), ch);
        }
        assert_eq!(engine.undo_depth(), 1);
        assert!(engine.undo(&mut buf));
        assert_eq!(buf.text(), "");
    }

    #[test]
    fn redo_replays_an_undone_edit() {
        let mut buf = TextBuffer::from_str("x");
        let mut engine = UndoEngine::new();
        engine.record("insert", false, &buf);
        buf.insert_at_position(Position(1), "y");
        engine.undo(&mut buf);
        assert_eq!(buf.text(), "x");
        assert!(engine.redo(&mut buf));
        assert_eq!(buf.text(), "xy");
    }

    #[test]
    fn undo_and_redo_preserve_mark_identity() {
        let mut buf = TextBuffer::from_str("hello");
        let mark = buf.create_mark(Position(0));
        let token = buf.token();
        let mut engine = UndoEngine::new();
        engine.record("insert", false, &buf);
        buf.insert_at_position(Position(5), " world");
        assert!(engine.undo(&mut buf));
        assert!(mark.is_valid());
        assert!(std::rc::Rc::ptr_eq(&token, &buf.token()));
        assert!(engine.redo(&mut buf));
        assert!(mark.is_valid());
        assert!(std::rc::Rc::ptr_eq(&token, &buf.token()));
    }
}

//! `TextDocument` (§4.G / §3): adds the in-memory undo stack and per-call
//! history logging on top of [`Document`]'s load/save/close lifecycle.
//! Every mutating operation on a `TextDocument` (and everything built on
//! top of it) goes through [`TextDocument::edit`], so an undo snapshot and
//! a history record can never be skipped by a caller (§8 Testable Property
//! 2 — "every mutation is undoable and every public call is logged").

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

use knut_history::{History, LogValue};
use knut_text::undo::UndoEngine;
use knut_text::TextBuffer;

use crate::document::Document;
use crate::error::DocumentError;

pub struct TextDocument {
    document: Document,
    undo: UndoEngine,
    history: Arc<History>,
}

impl Deref for TextDocument {
    type Target = Document;
    fn deref(&self) -> &Document {
        &self.document
    }
}

impl DerefMut for TextDocument {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}

impl TextDocument {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        Ok(Self::new(Document::load(path)?))
    }

    pub fn new(document: Document) -> Self {
        Self { document, undo: UndoEngine::new(), history: Arc::new(History::new()) }
    }

    /// Shares `history` instead of owning a private log — a `Project` wants
    /// every document it opens recorded into the same history so a script
    /// synthesized from it can span several files (§4.I, §4.K).
    pub fn with_history(document: Document, history: Arc<History>) -> Self {
        Self { document, undo: UndoEngine::new(), history }
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    pub fn buffer(&self) -> &TextBuffer {
        self.document.buffer.as_ref().expect("a text document always has a buffer once loaded")
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        self.document.buffer.as_mut().expect("a text document always has a buffer once loaded")
    }

    /// The seam every mutating API on `TextDocument` and its descendants
    /// runs through: pushes an undo snapshot (coalescing with the previous
    /// one when `merge` and the same `call_name` ran last), runs `f`, then
    /// logs the call — in that order, and unconditionally, so a script call
    /// can never mutate the buffer without becoming undoable and replayable.
    pub fn edit<R>(&mut self, call_name: &'static str, args: Vec<(&str, LogValue)>, merge: bool, f: impl FnOnce(&mut TextBuffer) -> R) -> R {
        let _scope = self.history.enter();
        let buffer = self.document.buffer.as_mut().expect("a text document always has a buffer once loaded");
        self.undo.record(call_name, merge, &*buffer);
        let result = f(buffer);
        self.history.log(call_name, args, None, merge, false);
        result
    }

    /// Logs a read-only call (navigation, a query) without touching the
    /// undo stack — still subject to the outermost-call-only rule (§4.K).
    pub fn record_call(&self, call_name: &'static str, args: Vec<(&str, LogValue)>, ret: Option<LogValue>) {
        let _scope = self.history.enter();
        self.history.log(call_name, args, ret, false, false);
    }

    pub fn undo(&mut self) -> bool {
        let Some(buffer) = self.document.buffer.as_mut() else { return false };
        self.undo.undo(buffer)
    }

    pub fn redo(&mut self) -> bool {
        let Some(buffer) = self.document.buffer.as_mut() else { return false };
        self.undo.redo(buffer)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.undo.redo_depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knut_text::Position;
    use std::fs;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn edit_records_undo_step_and_history_call() {
        let (_dir, path) = write_temp(b"hello");
        let mut doc = TextDocument::open(&path).unwrap();
        doc.edit("TextDocument::insert", vec![("text", LogValue::Str(" world".to_string()))], false, |b| {
            b.insert_at_position(Position(5), " world");
        });
        assert_eq!(doc.buffer().text(), "hello world");
        assert_eq!(doc.history().records().len(), 1);
        assert!(doc.undo());
        assert_eq!(doc.buffer().text(), "hello");
    }

    #[test]
    fn consecutive_merge_edits_collapse_into_one_undo_step() {
        let (_dir, path) = write_temp(b"");
        let mut doc = TextDocument::open(&path).unwrap();
        for ch in ["a", "b", "c"] {
            doc.edit("TextDocument::insert", vec![("text", LogValue::Str(ch.to_string()))], true, |b| {
                b.insert(ch);
            });
        }
        assert_eq!(doc.buffer().text(), "abc");
        assert_eq!(doc.undo_depth(), 1);
        assert!(doc.undo());
        assert_eq!(doc.buffer().text(), "");
    }

    #[test]
    fn nested_edit_only_logs_the_outermost_call() {
        let (_dir, path) = write_temp(b"x");
        let mut doc = TextDocument::open(&path).unwrap();
        let history = doc.history().clone();
        let _scope = history.enter();
        doc.edit("TextDocument::insert", vec![], false, |b| b.insert("y"));
        drop(_scope);
        assert_eq!(doc.history().records().len(), 0);
    }
}

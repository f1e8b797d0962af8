//! `CodeDocument` (§4.D / §5): layers a lazily-reparsed syntax tree and an
//! optional LSP connection on top of [`TextDocument`]. The §5 Ordering
//! Guarantee — content change, then revision increment, then tree
//! invalidation, then the LSP `didChange` notification — is implemented as
//! a single synchronous call in [`CodeDocument::edit`] so no caller can
//! observe a state where only part of that sequence has happened.

use std::ops::{Deref, DerefMut};

use knut_history::LogValue;
use knut_lsp::LspClient;
use knut_syntax::tree::{SourceLanguage, SyntaxTree};
use knut_text::TextBuffer;
use lsp_types::Url;

use crate::document::Document;
use crate::text_document::TextDocument;

pub struct CodeDocument {
    text: TextDocument,
    tree: SyntaxTree,
    revision: i32,
    lsp: Option<(LspClient, Url)>,
}

impl Deref for CodeDocument {
    type Target = TextDocument;
    fn deref(&self) -> &TextDocument {
        &self.text
    }
}

impl DerefMut for CodeDocument {
    fn deref_mut(&mut self) -> &mut TextDocument {
        &mut self.text
    }
}

impl CodeDocument {
    pub fn new(document: Document, language: SourceLanguage) -> Self {
        let source = document.buffer.as_ref().map(|b| b.text().to_string()).unwrap_or_default();
        Self { text: TextDocument::new(document), tree: SyntaxTree::new(source, language), revision: 0, lsp: None }
    }

    pub fn from_text_document(text: TextDocument, language: SourceLanguage) -> Self {
        let source = text.buffer().text().to_string();
        Self { text, tree: SyntaxTree::new(source, language), revision: 0, lsp: None }
    }

    /// Attaches an already-initialized LSP client; `did_change` notifications
    /// fire against `uri` on every subsequent [`CodeDocument::edit`]. A
    /// document with no attached client behaves exactly like a plain
    /// `TextDocument` plus a syntax tree — `did_change` is simply skipped.
    pub fn attach_lsp(&mut self, client: LspClient, uri: Url) {
        self.lsp = Some((client, uri));
    }

    pub fn detach_lsp(&mut self) {
        self.lsp = None;
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn language(&self) -> SourceLanguage {
        self.tree.language()
    }

    pub fn revision(&self) -> i32 {
        self.revision
    }

    /// §5 Ordering Guarantee. `f` performs the actual content edit; once it
    /// returns, this bumps the revision, replaces and invalidates the
    /// cached tree with the post-edit text, and — only then — notifies the
    /// LSP server, in that fixed order.
    pub fn edit<R>(&mut self, call_name: &'static str, args: Vec<(&str, LogValue)>, merge: bool, f: impl FnOnce(&mut TextBuffer) -> R) -> R {
        let result = self.text.edit(call_name, args, merge, f);
        self.revision += 1;
        let content = self.text.buffer().text().to_string();
        self.tree.set_source(content.clone());
        if let Some((client, uri)) = &self.lsp {
            client.did_change(uri.clone(), self.revision, &content);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knut_text::Position;
    use std::fs;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.cpp");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn edit_bumps_revision_and_resyncs_tree_source() {
        let (_dir, path) = write_temp(b"int a;");
        let doc = Document::load(&path).unwrap();
        let mut code = CodeDocument::new(doc, SourceLanguage::Cpp);
        assert_eq!(code.revision(), 0);
        code.edit("CodeDocument::insert", vec![], false, |b| {
            b.insert_at_position(Position(b.len()), " int b;");
        });
        assert_eq!(code.revision(), 1);
        assert_eq!(code.tree().source(), "int a; int b;");
    }

    #[test]
    fn edit_without_attached_lsp_does_not_panic() {
        let (_dir, path) = write_temp(b"int a;");
        let doc = Document::load(&path).unwrap();
        let mut code = CodeDocument::new(doc, SourceLanguage::Cpp);
        code.edit("CodeDocument::insert", vec![], false, |b| b.insert(";"));
        assert_eq!(code.revision(), 1);
    }
}

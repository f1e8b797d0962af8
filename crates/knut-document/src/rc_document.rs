//! `RcDocument` (§4.B / §4.C / §4.G): a [`TextDocument`] over an MFC `.rc`
//! resource script, holding the parsed [`RcFile`] data model alongside the
//! raw text. Reparsing is eager and happens on load and on every mutating
//! edit — `.rc` files are small relative to C++ translation units, so unlike
//! `CodeDocument`'s lazy tree-sitter reparse there is no benefit to
//! deferring it.

use std::ops::{Deref, DerefMut};

use knut_history::LogValue;
use knut_rc::{convert_dialog_by_id, parse_rc, ConversionFlag, RcError, RcFile, Scale, Widget};

use crate::document::Document;
use crate::text_document::TextDocument;

pub struct RcDocument {
    text: TextDocument,
    file: RcFile,
}

impl Deref for RcDocument {
    type Target = TextDocument;
    fn deref(&self) -> &TextDocument {
        &self.text
    }
}

impl DerefMut for RcDocument {
    fn deref_mut(&mut self) -> &mut TextDocument {
        &mut self.text
    }
}

impl RcDocument {
    pub fn new(document: Document) -> Self {
        let text = TextDocument::new(document);
        let file = parse_rc(text.buffer().text());
        Self { text, file }
    }

    pub fn file(&self) -> &RcFile {
        &self.file
    }

    fn reparse(&mut self) {
        self.file = parse_rc(self.text.buffer().text());
    }

    /// Any edit to the raw `.rc` text (e.g. through a generic find/replace)
    /// goes through this seam so the parsed model stays in sync with the
    /// buffer, the same invariant `CodeDocument::edit` keeps for its tree.
    pub fn edit<R>(&mut self, call_name: &'static str, args: Vec<(&str, LogValue)>, merge: bool, f: impl FnOnce(&mut knut_text::TextBuffer) -> R) -> R {
        let result = self.text.edit(call_name, args, merge, f);
        self.reparse();
        result
    }

    /// §4.B "Set current language".
    pub fn set_language(&mut self, language: &str) {
        self.text.record_call("RcDocument::setLanguage", vec![("language", LogValue::Str(language.to_string()))], None);
        self.file.set_language(language);
    }

    pub fn languages_list(&self) -> Vec<String> {
        self.file.languages_list()
    }

    pub fn merge_all_languages(&mut self) {
        self.text.record_call("RcDocument::mergeAllLanguages", vec![], None);
        self.file.merge_all_languages();
    }

    pub fn merge_languages(&mut self, from: &str) {
        self.text.record_call("RcDocument::mergeLanguages", vec![("from", LogValue::Str(from.to_string()))], None);
        self.file.merge_languages(from);
    }

    /// §4.C "Convert dialog to UI widget tree". `id` of `None` converts the
    /// first dialog declared in the current language.
    pub fn convert_dialog(&self, id: Option<&str>, flags: ConversionFlag, scale: Scale) -> Result<Widget, RcError> {
        self.text.record_call(
            "RcDocument::convertDialog",
            vec![("id", id.map(|s| LogValue::Str(s.to_string())).unwrap_or(LogValue::None))],
            None,
        );
        convert_dialog_by_id(&self.file, id, flags, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resource.rc");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn parses_dialogs_on_load_and_converts() {
        let source = "IDD_ABOUT DIALOGEX 0, 0, 200, 100\nCAPTION \"About\"\nBEGIN\n    PUSHBUTTON \"OK\", IDOK, 50, 70, 50, 14\nEND\n";
        let (_dir, path) = write_temp(source.as_bytes());
        let doc = Document::load(&path).unwrap();
        let rc = RcDocument::new(doc);
        assert_eq!(rc.file().current().dialogs.len(), 1);
        let widget = rc.convert_dialog(Some("IDD_ABOUT"), ConversionFlag::UPDATE_GEOMETRY, Scale::default()).unwrap();
        assert_eq!(widget.class, "QDialog");
    }

    #[test]
    fn edit_reparses_the_model() {
        let source = "IDD_ONE DIALOGEX 0, 0, 10, 10\nBEGIN\nEND\n";
        let (_dir, path) = write_temp(source.as_bytes());
        let doc = Document::load(&path).unwrap();
        let mut rc = RcDocument::new(doc);
        assert_eq!(rc.file().current().dialogs.len(), 1);
        let appended = "\nIDD_TWO DIALOGEX 0, 0, 10, 10\nBEGIN\nEND\n".to_string();
        rc.edit("RcDocument::append", vec![], false, |buffer| {
            let end = buffer.end_of_document();
            buffer.insert_at_position(end, &appended);
        });
        assert_eq!(rc.file().current().dialogs.len(), 2);
    }
}

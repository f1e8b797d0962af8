//! `JsonDocument` (§4.G): a [`TextDocument`] over a parsed `serde_json::Value`,
//! the same pointer-path access `Settings` uses for its layered config tree
//! (§4.L), but here the tree itself is the edited document rather than a
//! read-mostly configuration layer.

use std::ops::{Deref, DerefMut};

use knut_history::LogValue;
use serde_json::Value;

use crate::document::Document;
use crate::error::DocumentError;
use crate::text_document::TextDocument;

pub struct JsonDocument {
    text: TextDocument,
    value: Value,
}

impl Deref for JsonDocument {
    type Target = TextDocument;
    fn deref(&self) -> &TextDocument {
        &self.text
    }
}

impl DerefMut for JsonDocument {
    fn deref_mut(&mut self) -> &mut TextDocument {
        &mut self.text
    }
}

impl JsonDocument {
    pub fn new(document: Document) -> Result<Self, DocumentError> {
        let text = TextDocument::new(document);
        let path = text.path.clone();
        let value = serde_json::from_str(text.buffer().text()).map_err(|source| DocumentError::JsonParse { path, source })?;
        Ok(Self { text, value })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// JSON Pointer (RFC 6901) read, mirroring `Settings::value`.
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.value.pointer(pointer)
    }

    /// Replaces the value at `pointer` and rewrites the whole buffer from
    /// the updated tree, pretty-printed — this document's edits are
    /// structural, not textual, so there is no meaningful diff to apply to
    /// the raw text directly.
    pub fn set(&mut self, pointer: &str, new_value: Value) -> Result<(), DocumentError> {
        let Some(slot) = self.value.pointer_mut(pointer) else {
            return Err(DocumentError::PointerNotFound(pointer.to_string()));
        };
        *slot = new_value.clone();
        let rendered = serde_json::to_string_pretty(&self.value).expect("a parsed Value always re-serializes");
        self.text.edit(
            "JsonDocument::set",
            vec![("pointer", LogValue::Str(pointer.to_string()))],
            false,
            |buffer| {
                let end = buffer.end_of_document();
                buffer.delete_range(buffer.start_of_document(), end);
                buffer.insert(&rendered);
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn get_reads_by_pointer() {
        let (_dir, path) = write_temp(br#"{"a": {"b": 1}}"#);
        let doc = Document::load(&path).unwrap();
        let json = JsonDocument::new(doc).unwrap();
        assert_eq!(json.get("/a/b"), Some(&Value::from(1)));
    }

    #[test]
    fn set_rewrites_buffer_and_stays_parseable() {
        let (_dir, path) = write_temp(br#"{"a": 1}"#);
        let doc = Document::load(&path).unwrap();
        let mut json = JsonDocument::new(doc).unwrap();
        json.set("/a", Value::from(2)).unwrap();
        assert_eq!(json.get("/a"), Some(&Value::from(2)));
        assert!(serde_json::from_str::<Value>(json.buffer().text()).is_ok());
    }
}

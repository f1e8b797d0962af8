//! Document base & typed documents (§4.G): a shared load/save/close/reload
//! lifecycle, specialized per [`DocumentKind`] only in how its on-disk bytes
//! are interpreted.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use knut_text::TextBuffer;

use crate::bom::{strip_bom, with_bom, Bom};
use crate::error::DocumentError;
use crate::line_ending::{denormalize_line_endings, normalize_line_endings, LineEnding};

fn content_hash(text: &str) -> u64 {
    let mut h = DefaultHasher::new();
    h.write(text.as_bytes());
    h.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Cpp,
    Rc,
    Ui,
    Ts,
    Json,
    Image,
}

impl DocumentKind {
    /// File-type dispatch by extension (a stand-in for the Settings
    /// mime-types map referenced by §4.I).
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase().as_str() {
            "c" | "cc" | "cpp" | "cxx" | "h" | "hh" | "hpp" | "hxx" => DocumentKind::Cpp,
            "rc" | "rc2" => DocumentKind::Rc,
            "ui" => DocumentKind::Ui,
            "ts" => DocumentKind::Ts,
            "json" => DocumentKind::Json,
            "png" | "bmp" | "ico" | "jpg" | "jpeg" | "gif" => DocumentKind::Image,
            _ => DocumentKind::Text,
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(self, DocumentKind::Image)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    OverwriteDisk,
    KeepDisk,
}

/// The embedding UI's answer to "the file changed on disk since it was
/// opened; overwrite it anyway?" (§4.G `resolve_conflicts_on_save`).
pub trait ConflictResolver {
    fn resolve(&self, path: &Path) -> ConflictDecision;
}

/// Always overwrites — the non-interactive default used by the CLI and
/// tests, where there is no UI to ask.
pub struct AlwaysOverwrite;

impl ConflictResolver for AlwaysOverwrite {
    fn resolve(&self, _path: &Path) -> ConflictDecision {
        ConflictDecision::OverwriteDisk
    }
}

#[derive(Debug, Clone)]
pub enum DocumentEvent {
    Opened(PathBuf),
    Closed(PathBuf),
    FileUpdated(PathBuf),
}

pub struct Document {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub buffer: Option<TextBuffer>,
    bom: Option<Bom>,
    line_ending: LineEnding,
    had_trailing_newline: bool,
    mtime: Option<SystemTime>,
    /// Content hash taken at the last load/save. `is_dirty()` is this
    /// compared against the buffer's current hash — there is no settable
    /// dirty flag, so an edit can never be forgotten by a caller (§8
    /// Testable Property 2).
    baseline_hash: u64,
    listeners: Vec<Box<dyn Fn(&DocumentEvent) + Send + Sync>>,
}

impl Document {
    /// §4.G `load(path)`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        let kind = DocumentKind::for_path(&path);
        let mut doc = Document {
            path: path.clone(),
            kind,
            buffer: None,
            bom: None,
            line_ending: LineEnding::Lf,
            had_trailing_newline: true,
            mtime: None,
            baseline_hash: content_hash(""),
            listeners: Vec::new(),
        };
        doc.do_load()?;
        doc.emit(DocumentEvent::Opened(path));
        Ok(doc)
    }

    fn do_load(&mut self) -> Result<(), DocumentError> {
        let raw = fs::read(&self.path).map_err(|source| DocumentError::Read { path: self.path.clone(), source })?;
        if self.kind.is_binary() {
            self.mtime = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
            return Ok(());
        }
        let (stripped, bom) = strip_bom(&raw);
        let text = std::str::from_utf8(stripped).map_err(|_| DocumentError::NotUtf8 { path: self.path.clone() })?;
        let normalized = normalize_line_endings(text);
        self.bom = bom;
        self.line_ending = normalized.original;
        self.had_trailing_newline = normalized.had_trailing_newline;
        self.buffer = Some(TextBuffer::from_str(&normalized.normalized));
        self.mtime = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        self.baseline_hash = content_hash(&normalized.normalized);
        tracing::debug!(target: "document", path = %self.path.display(), kind = ?self.kind, "loaded");
        Ok(())
    }

    /// §4.G `save()`.
    pub fn save(&mut self, resolver: &dyn ConflictResolver) -> Result<(), DocumentError> {
        self.resolve_conflicts_on_save(resolver)?;
        self.do_save(&self.path.clone())?;
        self.baseline_hash = self.buffer.as_ref().map(|b| content_hash(b.text())).unwrap_or(self.baseline_hash);
        self.mtime = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        Ok(())
    }

    /// §4.G `save_as(p)`.
    pub fn save_as(&mut self, new_path: impl Into<PathBuf>, resolver: &dyn ConflictResolver) -> Result<(), DocumentError> {
        let new_path = new_path.into();
        if new_path != self.path {
            self.resolve_conflicts_on_save(resolver)?;
            self.do_save(&new_path)?;
            self.emit(DocumentEvent::Closed(self.path.clone()));
            self.path = new_path.clone();
            self.mtime = fs::metadata(&new_path).ok().and_then(|m| m.modified().ok());
            self.baseline_hash = self.buffer.as_ref().map(|b| content_hash(b.text())).unwrap_or(self.baseline_hash);
            self.emit(DocumentEvent::Opened(new_path));
        } else {
            self.save(resolver)?;
        }
        Ok(())
    }

    fn do_save(&self, path: &Path) -> Result<(), DocumentError> {
        if self.kind.is_binary() {
            return Ok(());
        }
        let Some(buffer) = &self.buffer else { return Ok(()) };
        let mut text = denormalize_line_endings(buffer.text(), self.line_ending);
        if !self.had_trailing_newline {
            while text.ends_with(self.line_ending.as_str()) {
                text.truncate(text.len() - self.line_ending.as_str().len());
            }
        }
        let bytes = with_bom(&text, self.bom);
        fs::write(path, bytes).map_err(|source| DocumentError::Write { path: path.to_path_buf(), source })?;
        tracing::debug!(target: "document", path = %path.display(), "saved");
        Ok(())
    }

    /// §4.G `resolve_conflicts_on_save`.
    fn resolve_conflicts_on_save(&self, resolver: &dyn ConflictResolver) -> Result<(), DocumentError> {
        let Some(recorded) = self.mtime else { return Ok(()) };
        let current = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        if current != Some(recorded) && current.is_some() {
            if resolver.resolve(&self.path) == ConflictDecision::KeepDisk {
                return Err(DocumentError::Conflict { path: self.path.clone() });
            }
        }
        Ok(())
    }

    /// §4.G `close()`.
    pub fn close(&mut self, resolver: &dyn ConflictResolver) -> Result<(), DocumentError> {
        if self.is_dirty() {
            self.save(resolver)?;
        }
        self.emit(DocumentEvent::Closed(self.path.clone()));
        Ok(())
    }

    /// §4.G `reload()`.
    pub fn reload(&mut self) -> Result<(), DocumentError> {
        self.do_load()?;
        self.emit(DocumentEvent::FileUpdated(self.path.clone()));
        Ok(())
    }

    /// True iff the buffer's content hash no longer matches the hash taken
    /// at the last load/save — derived, not a flag a caller can forget to
    /// set or clear.
    pub fn is_dirty(&self) -> bool {
        match &self.buffer {
            Some(buffer) => content_hash(buffer.text()) != self.baseline_hash,
            None => false,
        }
    }

    pub fn on_event(&mut self, listener: impl Fn(&DocumentEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&self, event: DocumentEvent) {
        tracing::debug!(target: "document", ?event, "document event");
        for listener in &self.listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.cpp");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn load_detects_crlf_and_save_restores_it() {
        let (_dir, path) = write_temp(b"int a;\r\nint b;\r\n");
        let mut doc = Document::load(&path).unwrap();
        assert_eq!(doc.buffer.as_ref().unwrap().text(), "int a;\nint b;\n");
        assert!(!doc.is_dirty());
        doc.buffer.as_mut().unwrap().insert_at_line(2, "int c;\n");
        assert!(doc.is_dirty());
        doc.save(&AlwaysOverwrite).unwrap();
        assert!(!doc.is_dirty());
        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\r\n"));
        assert!(saved.contains("int c;"));
    }

    #[test]
    fn load_strips_and_save_restores_utf8_bom() {
        let mut bytes = Bom::Utf8.bytes().to_vec();
        bytes.extend_from_slice(b"int a;\n");
        let (_dir, path) = write_temp(&bytes);
        let mut doc = Document::load(&path).unwrap();
        assert_eq!(doc.buffer.as_ref().unwrap().text(), "int a;\n");
        doc.buffer.as_mut().unwrap().insert(";");
        assert!(doc.is_dirty());
        doc.save(&AlwaysOverwrite).unwrap();
        let saved = fs::read(&path).unwrap();
        assert!(saved.starts_with(Bom::Utf8.bytes()));
    }

    #[test]
    fn kind_dispatch_by_extension() {
        assert_eq!(DocumentKind::for_path(Path::new("a.rc")), DocumentKind::Rc);
        assert_eq!(DocumentKind::for_path(Path::new("a.ui")), DocumentKind::Ui);
        assert_eq!(DocumentKind::for_path(Path::new("a.png")), DocumentKind::Image);
        assert_eq!(DocumentKind::for_path(Path::new("a.unknown")), DocumentKind::Text);
    }
}

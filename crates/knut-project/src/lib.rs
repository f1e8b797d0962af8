//! Project & open-document set (§4.I): a hash-addressed set of open
//! [`Document`]s shared across scripts, a most-recently-used stack for
//! `open_previous`, and a `find_in_files` wrapper around `ripgrep`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use knut_document::{AlwaysOverwrite, Document, DocumentError, DocumentKind};
use knut_settings::Settings;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("ripgrep is not available on PATH")]
    RipgrepUnavailable,
    #[error("failed to run ripgrep: {0}")]
    RipgrepSpawn(#[source] std::io::Error),
}

/// §4.I file-type dispatch via the Settings `mime_types` map, falling back
/// to extension-based dispatch when the map has no entry.
pub fn kind_for(path: &Path, settings: &Settings) -> DocumentKind {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    let mapped = settings.value(&format!("/mime_types/{ext}")).and_then(|v| v.as_str());
    match mapped {
        Some("Cpp") => DocumentKind::Cpp,
        Some("Rc") => DocumentKind::Rc,
        Some("Ui") => DocumentKind::Ui,
        Some("Ts") => DocumentKind::Ts,
        Some("Json") => DocumentKind::Json,
        _ => DocumentKind::for_path(path),
    }
}

#[derive(Debug, Clone)]
pub struct FindMatch {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub text: String,
}

/// The open-document set for one project root. Documents are keyed by their
/// canonical path; `mru` tracks recency with the back of the vector holding
/// the most recently used entry.
pub struct Project {
    root: PathBuf,
    documents: HashMap<PathBuf, Document>,
    mru: Vec<PathBuf>,
    current: Option<PathBuf>,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), documents: HashMap::new(), mru: Vec::new(), current: None }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn canonical(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }

    /// §4.I `get(path)`: returns the already-open [`Document`] for `path`,
    /// or loads and inserts it.
    pub fn get(&mut self, path: &Path) -> Result<&mut Document, ProjectError> {
        let key = Self::canonical(path);
        if !self.documents.contains_key(&key) {
            let doc = Document::load(key.as_path())?;
            tracing::info!(target: "project", path = %key.display(), "opened document");
            self.documents.insert(key.clone(), doc);
        }
        Ok(self.documents.get_mut(&key).unwrap())
    }

    /// §4.I `open(path)`: `get`, then makes it current and moves it to the
    /// back of the MRU stack.
    pub fn open(&mut self, path: &Path) -> Result<&mut Document, ProjectError> {
        let key = Self::canonical(path);
        self.get(&key)?;
        self.mru.retain(|p| p != &key);
        self.mru.push(key.clone());
        self.current = Some(key.clone());
        Ok(self.documents.get_mut(&key).unwrap())
    }

    pub fn current(&self) -> Option<&Document> {
        self.current.as_ref().and_then(|p| self.documents.get(p))
    }

    pub fn current_mut(&mut self) -> Option<&mut Document> {
        let Some(p) = self.current.clone() else { return None };
        self.documents.get_mut(&p)
    }

    /// §4.I `open_previous(n)`: the `n`-th most recently used document
    /// (`0` is the current one), or `None` if the stack is shorter than
    /// `n + 1`.
    pub fn open_previous(&mut self, n: usize) -> Option<&mut Document> {
        let len = self.mru.len();
        let idx = len.checked_sub(n + 1)?;
        let path = self.mru[idx].clone();
        self.mru.retain(|p| p != &path);
        self.mru.push(path.clone());
        self.current = Some(path.clone());
        self.documents.get_mut(&path)
    }

    /// Closes and drops `path` from the open-document set, saving first if
    /// dirty.
    pub fn close(&mut self, path: &Path) -> Result<(), ProjectError> {
        let key = Self::canonical(path);
        if let Some(mut doc) = self.documents.remove(&key) {
            doc.close(&AlwaysOverwrite)?;
        }
        self.mru.retain(|p| p != &key);
        if self.current.as_deref() == Some(key.as_path()) {
            self.current = self.mru.last().cloned();
        }
        Ok(())
    }

    pub fn open_paths(&self) -> impl Iterator<Item = &Path> {
        self.documents.keys().map(|p| p.as_path())
    }

    /// §4.I `find_in_files(pattern)`: shells out to
    /// `rg --vimgrep -U --multiline-dotall <pattern> <root>` and parses
    /// `file:line:col:text` lines. `None` if `rg` isn't on `PATH`.
    pub fn find_in_files(&self, pattern: &str) -> Result<Vec<FindMatch>, ProjectError> {
        if which_rg().is_none() {
            return Err(ProjectError::RipgrepUnavailable);
        }
        let output = Command::new("rg")
            .arg("--vimgrep")
            .arg("-U")
            .arg("--multiline-dotall")
            .arg(pattern)
            .arg(&self.root)
            .output()
            .map_err(ProjectError::RipgrepSpawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_vimgrep_line).collect())
    }
}

fn which_rg() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join("rg")).find(|candidate| candidate.is_file())
}

/// Parses one `rg --vimgrep` line: `file:line:col:text`. Splits only on the
/// first two colons so a Windows drive-letter prefix (`C:\foo\bar.cpp:10:4:`)
/// is not mistaken for the line/column separators.
fn parse_vimgrep_line(line: &str) -> Option<FindMatch> {
    let mut search_from = 0;
    if line.len() >= 2 && line.as_bytes()[1] == b':' && line.as_bytes()[0].is_ascii_alphabetic() {
        search_from = 2;
    }
    let rest = &line[search_from..];
    let first_colon = rest.find(':')?;
    let (file_part, after_file) = rest.split_at(first_colon);
    let after_file = &after_file[1..];
    let second_colon = after_file.find(':')?;
    let (line_part, after_line) = after_file.split_at(second_colon);
    let after_line = &after_line[1..];
    let third_colon = after_line.find(':')?;
    let (col_part, text_part) = after_line.split_at(third_colon);
    let text_part = &text_part[1..];

    Some(FindMatch {
        file: PathBuf::from(format!("{}{file_part}", &line[..search_from])),
        line: line_part.parse().ok()?,
        column: col_part.parse().ok()?,
        text: text_part.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_vimgrep_line() {
        let m = parse_vimgrep_line("src/main.cpp:12:5:    int x = 0;").unwrap();
        assert_eq!(m.file, PathBuf::from("src/main.cpp"));
        assert_eq!(m.line, 12);
        assert_eq!(m.column, 5);
        assert_eq!(m.text, "    int x = 0;");
    }

    #[test]
    fn parses_vimgrep_line_with_windows_drive_letter() {
        let m = parse_vimgrep_line(r"C:\proj\main.cpp:12:5:    int x = 0;").unwrap();
        assert_eq!(m.file, PathBuf::from(r"C:\proj\main.cpp"));
        assert_eq!(m.line, 12);
        assert_eq!(m.column, 5);
    }

    #[test]
    fn get_reuses_already_open_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cpp");
        fs::write(&path, "int a;\n").unwrap();
        let mut project = Project::new(dir.path());
        project.get(&path).unwrap();
        assert_eq!(project.open_paths().count(), 1);
        project.get(&path).unwrap();
        assert_eq!(project.open_paths().count(), 1);
    }

    #[test]
    fn open_tracks_mru_and_open_previous() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.cpp");
        let b = dir.path().join("b.cpp");
        fs::write(&a, "a\n").unwrap();
        fs::write(&b, "b\n").unwrap();
        let mut project = Project::new(dir.path());
        project.open(&a).unwrap();
        project.open(&b).unwrap();
        assert_eq!(project.current().unwrap().path, b.canonicalize().unwrap());
        let prev = project.open_previous(1).unwrap();
        assert_eq!(prev.path, a.canonicalize().unwrap());
    }
}

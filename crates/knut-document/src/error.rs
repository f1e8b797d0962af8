use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
    #[error("save of {path} aborted: on-disk copy changed since it was opened")]
    Conflict { path: PathBuf },
    #[error("document has no associated path")]
    NoPath,
    #[error("{path} is not valid JSON: {source}")]
    JsonParse { path: PathBuf, #[source] source: serde_json::Error },
    #[error("{path} is not well-formed XML: {source}")]
    XmlParse { path: PathBuf, #[source] source: roxmltree::Error },
    #[error("no value at pointer {0:?}")]
    PointerNotFound(String),
    #[error(transparent)]
    Refactor(#[from] knut_refactor::RefactorError),
    #[error(transparent)]
    Rc(#[from] knut_rc::RcError),
}

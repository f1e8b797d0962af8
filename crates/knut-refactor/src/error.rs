use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefactorError {
    #[error("include name {0:?} is not well-formed")]
    MalformedInclude(String),
    #[error("class {0:?} not found")]
    ClassNotFound(String),
    #[error("no corresponding header/source file found for {0}")]
    NoCorrespondingFile(String),
    #[error("symbol {0:?} not found")]
    SymbolNotFound(String),
    #[error("method signature could not be parsed: {0:?}")]
    MalformedSignature(String),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LspError {
    #[error("failed to spawn language server: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("io error talking to language server: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON-RPC message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("server returned an error response: {0}")]
    Server(String),
    #[error("client is not initialized")]
    NotInitialized,
}

//! LSP client wrapper (§4.E, interface only): a thin stdio JSON-RPC client
//! the core depends on for hover/declaration/references. Every call is
//! infallible from the caller's perspective — if the client was never
//! initialized, or the server died, or a request failed, the call logs a
//! warning and returns an empty result instead of propagating the error.
//!
//! The transport is a background reader thread plus blocking writes on the
//! caller's thread, the same shape `ScriptManager` uses for its directory
//! watcher and async script runs — no async runtime involved.

use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread;

use crossbeam_channel::Sender;
use lsp_types::request::{GotoDeclarationParams, GotoDeclarationResponse};
use lsp_types::{
    ClientCapabilities, DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, Hover, HoverParams,
    InitializeParams, InitializeResult, Location, PartialResultParams, Position as LspPosition, ReferenceContext, ReferenceParams,
    TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem, TextDocumentPositionParams, Url, VersionedTextDocumentIdentifier,
    WorkDoneProgressParams, WorkspaceFolder,
};
use serde_json::{json, Value};

use crate::error::LspError;
use crate::rpc::{read_message, write_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready,
    ShuttingDown,
}

struct Inner {
    stdin: StdMutex<Option<std::process::ChildStdin>>,
    pending: StdMutex<HashMap<i64, Sender<Value>>>,
    next_id: AtomicI64,
    state: StdMutex<State>,
}

/// A consuming LSP client. One instance talks to one spawned server process.
/// Cloning shares the underlying connection — the same pattern `ScriptManager`
/// uses to hand a `Shared` handle to a spawned worker thread.
#[derive(Clone)]
pub struct LspClient {
    inner: Arc<Inner>,
}

impl Default for LspClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LspClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                stdin: StdMutex::new(None),
                pending: StdMutex::new(HashMap::new()),
                next_id: AtomicI64::new(1),
                state: StdMutex::new(State::Uninitialized),
            }),
        }
    }

    fn is_ready(&self) -> bool {
        *self.inner.state.lock().unwrap() == State::Ready
    }

    /// §4.E `initialize(root)`: spawns `command` and performs the
    /// initialize/initialized handshake.
    pub fn initialize(&self, command: &str, args: &[String], root: &Path) -> bool {
        match self.try_initialize(command, args, root) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "lsp.client", %err, "initialization failed, client will no-op");
                false
            }
        }
    }

    fn try_initialize(&self, command: &str, args: &[String], root: &Path) -> Result<(), LspError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(LspError::Spawn)?;

        let stdin = child.stdin.take().ok_or_else(|| LspError::Protocol("server has no stdin".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| LspError::Protocol("server has no stdout".to_string()))?;
        *self.inner.stdin.lock().unwrap() = Some(stdin);

        let inner = self.inner.clone();
        thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                match read_message(&mut reader) {
                    Ok(Some(msg)) => dispatch_incoming(&inner, msg),
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(target: "lsp.client", %err, "reader thread exiting");
                        break;
                    }
                }
            }
            let _ = child; // keep the server process alive for the lifetime of the reader thread
        });

        let root_uri = Url::from_directory_path(root).map_err(|()| LspError::Protocol("root path is not a valid URL".to_string()))?;
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_uri: Some(root_uri.clone()),
            capabilities: ClientCapabilities::default(),
            workspace_folders: Some(vec![WorkspaceFolder { uri: root_uri, name: "root".to_string() }]),
            ..Default::default()
        };
        let _: InitializeResult = self.request_typed("initialize", &params)?;
        self.notify("initialized", &json!({}))?;
        *self.inner.state.lock().unwrap() = State::Ready;
        Ok(())
    }

    /// §4.E `open_project`/`close_project`: informational only, logged.
    pub fn open_project(&self, root: &Path) {
        tracing::debug!(target: "lsp.client", root = %root.display(), "project opened");
    }

    pub fn close_project(&self, root: &Path) {
        tracing::debug!(target: "lsp.client", root = %root.display(), "project closed");
    }

    pub fn did_open(&self, uri: Url, language_id: &str, version: i32, text: &str) {
        if !self.is_ready() {
            tracing::warn!(target: "lsp.client", "did_open called before initialization");
            return;
        }
        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem { uri, language_id: language_id.to_string(), version, text: text.to_string() },
        };
        if let Err(err) = self.notify("textDocument/didOpen", &params) {
            tracing::warn!(target: "lsp.client", %err, "did_open failed");
        }
    }

    pub fn did_close(&self, uri: Url) {
        if !self.is_ready() {
            return;
        }
        let params = DidCloseTextDocumentParams { text_document: TextDocumentIdentifier { uri } };
        if let Err(err) = self.notify("textDocument/didClose", &params) {
            tracing::warn!(target: "lsp.client", %err, "did_close failed");
        }
    }

    /// §4.E `did_change`: called by `CodeDocument` on every edit, strictly
    /// after it has bumped its own revision counter and invalidated its
    /// syntax tree (§5 Ordering Guarantee) — this method itself only speaks
    /// the wire protocol.
    pub fn did_change(&self, uri: Url, version: i32, text: &str) {
        if !self.is_ready() {
            return;
        }
        let params = DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier { uri, version },
            content_changes: vec![TextDocumentContentChangeEvent { range: None, range_length: None, text: text.to_string() }],
        };
        if let Err(err) = self.notify("textDocument/didChange", &params) {
            tracing::warn!(target: "lsp.client", %err, "did_change failed");
        }
    }

    pub fn hover(&self, uri: Url, position: LspPosition) -> Option<Hover> {
        if !self.is_ready() {
            tracing::warn!(target: "lsp.client", "hover called before initialization");
            return None;
        }
        let params = HoverParams {
            text_document_position_params: TextDocumentPositionParams { text_document: TextDocumentIdentifier { uri }, position },
            work_done_progress_params: WorkDoneProgressParams::default(),
        };
        match self.request_typed::<_, Option<Hover>>("textDocument/hover", &params) {
            Ok(hover) => hover,
            Err(err) => {
                tracing::warn!(target: "lsp.client", %err, "hover failed");
                None
            }
        }
    }

    /// Callback variant of [`LspClient::hover`]: runs the (blocking) request
    /// on a spawned thread and hands the result to `callback` there, the way
    /// `ScriptManager::run_script`'s `async_` branch spawns a thread instead
    /// of blocking the caller.
    pub fn hover_async(&self, uri: Url, position: LspPosition, callback: impl FnOnce(Option<Hover>) + Send + 'static) {
        let client = self.clone();
        thread::spawn(move || {
            let result = client.hover(uri, position);
            callback(result);
        });
    }

    pub fn declaration(&self, uri: Url, position: LspPosition) -> Vec<Location> {
        if !self.is_ready() {
            tracing::warn!(target: "lsp.client", "declaration called before initialization");
            return Vec::new();
        }
        let params = GotoDeclarationParams {
            text_document_position_params: TextDocumentPositionParams { text_document: TextDocumentIdentifier { uri }, position },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };
        match self.request_typed::<_, Option<GotoDeclarationResponse>>("textDocument/declaration", &params) {
            Ok(Some(GotoDeclarationResponse::Scalar(loc))) => vec![loc],
            Ok(Some(GotoDeclarationResponse::Array(locs))) => locs,
            Ok(Some(GotoDeclarationResponse::Link(links))) => {
                links.into_iter().map(|l| Location { uri: l.target_uri, range: l.target_selection_range }).collect()
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(target: "lsp.client", %err, "declaration failed");
                Vec::new()
            }
        }
    }

    pub fn references(&self, uri: Url, position: LspPosition, include_declaration: bool) -> Vec<Location> {
        if !self.is_ready() {
            tracing::warn!(target: "lsp.client", "references called before initialization");
            return Vec::new();
        }
        let params = ReferenceParams {
            text_document_position: TextDocumentPositionParams { text_document: TextDocumentIdentifier { uri }, position },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: ReferenceContext { include_declaration },
        };
        match self.request_typed::<_, Option<Vec<Location>>>("textDocument/references", &params) {
            Ok(locs) => locs.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(target: "lsp.client", %err, "references failed");
                Vec::new()
            }
        }
    }

    pub fn shutdown(&self) {
        if !self.is_ready() {
            return;
        }
        if let Err(err) = self.request_typed::<_, Value>("shutdown", &json!(null)) {
            tracing::warn!(target: "lsp.client", %err, "shutdown request failed");
        }
        let _ = self.notify("exit", &json!(null));
        *self.inner.state.lock().unwrap() = State::ShuttingDown;
    }

    fn request_typed<P: serde::Serialize, R: serde::de::DeserializeOwned>(&self, method: &str, params: &P) -> Result<R, LspError> {
        let value = self.request(method, serde_json::to_value(params)?)?;
        Ok(serde_json::from_value(value)?)
    }

    fn request(&self, method: &str, params: Value) -> Result<Value, LspError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.inner.pending.lock().unwrap().insert(id, tx);
        let msg = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        {
            let mut guard = self.inner.stdin.lock().unwrap();
            let stdin = guard.as_mut().ok_or(LspError::NotInitialized)?;
            write_message(stdin, &msg)?;
        }
        rx.recv().map_err(|_| LspError::Protocol("response channel closed before reply arrived".to_string()))
    }

    fn notify<P: serde::Serialize>(&self, method: &str, params: &P) -> Result<(), LspError> {
        let msg = json!({"jsonrpc": "2.0", "method": method, "params": params});
        let mut guard = self.inner.stdin.lock().unwrap();
        let stdin = guard.as_mut().ok_or(LspError::NotInitialized)?;
        write_message(stdin, &msg)
    }
}

fn dispatch_incoming(inner: &Inner, msg: Value) {
    let Some(id) = msg.get("id").and_then(Value::as_i64) else {
        tracing::trace!(target: "lsp.client", "ignoring server notification/request");
        return;
    };
    let Some(sender) = inner.pending.lock().unwrap().remove(&id) else {
        return;
    };
    if let Some(error) = msg.get("error") {
        tracing::warn!(target: "lsp.client", %error, "server responded with an error");
    }
    let _ = sender.send(msg.get("result").cloned().unwrap_or(Value::Null));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_starts_uninitialized() {
        let client = LspClient::new();
        assert!(!client.is_ready());
    }
}

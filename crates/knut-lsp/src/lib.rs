//! LSP client wrapper (§4.E): stdio JSON-RPC transport, a consuming client
//! exposing the operations the core needs, and offset↔LSP-position
//! conversion helpers.

mod client;
mod error;
mod position;
mod rpc;

pub use client::LspClient;
pub use error::LspError;
pub use position::{lsp_position_to_offset, offset_to_lsp_position};

pub use lsp_types;

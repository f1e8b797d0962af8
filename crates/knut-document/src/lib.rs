//! Document base and typed documents (§4.G): the shared
//! load/save/close/reload lifecycle every document kind shares, plus the
//! line-ending and BOM handling that lets a save round-trip a file exactly
//! as it was found on disk.

pub mod bom;
pub mod code_document;
pub mod cpp_document;
pub mod document;
pub mod error;
pub mod json_document;
pub mod line_ending;
pub mod rc_document;
pub mod text_document;
pub mod ts_document;
pub mod ui_document;

pub use bom::Bom;
pub use code_document::CodeDocument;
pub use cpp_document::CppDocument;
pub use document::{AlwaysOverwrite, ConflictDecision, ConflictResolver, Document, DocumentEvent, DocumentKind};
pub use error::DocumentError;
pub use json_document::JsonDocument;
pub use line_ending::{denormalize_line_endings, normalize_line_endings, LineEnding, NormalizedText};
pub use rc_document::RcDocument;
pub use text_document::TextDocument;
pub use ts_document::{QtTsDocument, TsMessage};
pub use ui_document::{UiDocument, UiWidget};

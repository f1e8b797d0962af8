//! Tree-sitter helper and symbol model (§4.D, §4.F).

pub mod query;
pub mod selection;
pub mod symbol;
pub mod tree;

pub use query::{Capture, QueryCache, QueryError, QueryMatch};
pub use selection::{select_larger, select_next, select_previous, select_smaller};
pub use symbol::{extract_symbols, Symbol, SymbolKind};
pub use tree::{named_children, next_named_sibling, node_at, node_covering_range, nodes_in_range, previous_named_sibling, SourceLanguage, SyntaxTree};

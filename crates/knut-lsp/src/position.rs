//! Offset↔LSP-position conversion (§4.E), performed by the caller over the
//! text buffer rather than by the client itself.

use knut_text::{LineColumn, Position, TextBuffer};
use lsp_types::Position as LspPosition;

/// `offset_to_lsp_position(o)`: line = block number at `o`, character =
/// `o - block_start`.
pub fn offset_to_lsp_position(buffer: &TextBuffer, offset: Position) -> LspPosition {
    let LineColumn { line, column } = buffer.position_to_line_column(offset);
    LspPosition { line: line as u32, character: column as u32 }
}

/// `lsp_position_to_offset((l,c))`: clamp `l` to `[0, line_count)`, then the
/// offset of the line start plus `c`, clamped to the line length.
pub fn lsp_position_to_offset(buffer: &TextBuffer, position: LspPosition) -> Position {
    let line = (position.line as usize).min(buffer.line_count().saturating_sub(1));
    buffer.line_column_to_position(LineColumn { line, column: position.character as usize })
}

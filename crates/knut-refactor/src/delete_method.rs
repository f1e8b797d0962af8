//! Delete method (§4.H): select matching Function symbols, then delete each
//! one's text span plus leading same-line whitespace, a trailing `;`, and
//! one trailing newline — processed in descending start-offset order so
//! earlier deletions don't invalidate later byte offsets.

use knut_syntax::symbol::{Symbol, SymbolKind};
use knut_text::{Position, TextBuffer};

/// Deletes every symbol in `symbols` named `name` (and, if given, whose
/// rendered signature — `parameters`, compared verbatim — matches
/// `signature`) that is a Function or Method.
pub fn delete_method(buffer: &mut TextBuffer, symbols: &[Symbol], name: &str, signature: Option<&str>) -> usize {
    let mut matching: Vec<&Symbol> = symbols
        .iter()
        .filter(|s| matches!(s.kind, SymbolKind::Function | SymbolKind::Method))
        .filter(|s| s.name == name || s.name.ends_with(&format!("::{name}")))
        .filter(|s| signature.is_none_or(|sig| s.parameters.as_deref() == Some(sig)))
        .collect();

    matching.sort_by(|a, b| b.range.0.cmp(&a.range.0));

    let mut count = 0;
    for symbol in matching {
        delete_span(buffer, symbol.range.0, symbol.range.1);
        count += 1;
    }
    count
}

fn delete_span(buffer: &mut TextBuffer, start: usize, end: usize) {
    let text = buffer.text();
    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let leading_ws_start = if text[line_start..start].chars().all(char::is_whitespace) { line_start } else { start };

    let mut delete_end = end;
    let rest = &text[end..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if let Some(stripped) = trimmed.strip_prefix(';') {
        delete_end = text.len() - stripped.len();
        if let Some(after_semi) = stripped.strip_prefix('\n') {
            delete_end = text.len() - after_semi.len();
        }
    } else if let Some(stripped) = rest.strip_prefix('\n') {
        delete_end = text.len() - stripped.len();
    }

    buffer.delete_range(Position(leading_ws_start), Position(delete_end));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletes_method_body_and_trailing_semicolon() {
        let mut buffer = TextBuffer::from_str("class Widget {\n    void paint() {}\n    void resize() {}\n};\n");
        let symbols = vec![Symbol {
            name: "Widget::paint".to_string(),
            kind: SymbolKind::Method,
            range: (buffer.text().find("void paint").unwrap(), buffer.text().find("{}\n    void resize").unwrap() + 2),
            selection_range: (0, 0),
            return_type: None,
            parameters: None,
        }];
        let deleted = delete_method(&mut buffer, &symbols, "paint", None);
        assert_eq!(deleted, 1);
        assert!(!buffer.text().contains("paint"));
        assert!(buffer.text().contains("resize"));
    }
}

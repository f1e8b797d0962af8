//! Toggle section (§4.H): wraps (or unwraps) a function body in
//! `#ifdef TAG / #else / #endif`, emitting a debug call and a return
//! appropriate to the function's return type in the `#else` branch.

use std::collections::HashMap;

use knut_syntax::tree::{node_covering_range, SourceLanguage, SyntaxTree};
use knut_text::{Position, TextBuffer};
use tree_sitter::Node;

use crate::error::RefactorError;

/// Per-return-type literal overrides, falling back to `void`→`return;`,
/// pointer types→`return nullptr;`, anything else→`return {};`.
pub struct ToggleSection<'a> {
    pub tag: &'a str,
    pub debug_format: &'a str,
    pub return_values: &'a HashMap<String, String>,
}

fn default_return_for(return_type: &str) -> String {
    let trimmed = return_type.trim();
    if trimmed == "void" {
        "return;".to_string()
    } else if trimmed.ends_with('*') {
        "return nullptr;".to_string()
    } else {
        "return {};".to_string()
    }
}

fn enclosing_function<'t>(root: Node<'t>, offset: usize) -> Option<Node<'t>> {
    let covering = node_covering_range(root, offset, offset);
    let mut node = Some(covering);
    while let Some(n) = node {
        if n.kind() == "function_definition" {
            return Some(n);
        }
        node = n.parent();
    }
    None
}

fn function_name(def: Node<'_>, source: &str) -> String {
    let mut node = def.child_by_field_name("declarator");
    while let Some(n) = node {
        if n.kind() == "function_declarator" {
            if let Some(inner) = n.child_by_field_name("declarator") {
                return source[inner.start_byte()..inner.end_byte()].to_string();
            }
        }
        node = n.child_by_field_name("declarator");
    }
    "function".to_string()
}

fn return_type_text(def: Node<'_>, source: &str) -> String {
    def.child_by_field_name("type").map(|n| source[n.start_byte()..n.end_byte()].to_string()).unwrap_or_default()
}

/// Without a selection, finds the function enclosing `offset` and wraps its
/// body. If the body is already wrapped (its last statement before the
/// closing brace is `#endif // TAG`), unwraps it instead.
pub fn toggle_section(buffer: &mut TextBuffer, offset: usize, opts: &ToggleSection<'_>) -> Result<(), RefactorError> {
    let tree = SyntaxTree::new(buffer.text().to_string(), SourceLanguage::Cpp);
    let t = tree.tree();
    let def = enclosing_function(t.root_node(), offset).ok_or_else(|| RefactorError::SymbolNotFound("enclosing function".to_string()))?;
    let body = def.child_by_field_name("body").ok_or_else(|| RefactorError::SymbolNotFound("function body".to_string()))?;

    let source = tree.source();
    let open_brace = body.start_byte();
    let close_brace = body.end_byte() - 1;
    let interior = &source[open_brace + 1..close_brace];

    let endif_marker = format!("#endif // {}", opts.tag);
    if interior.trim_end().ends_with(&endif_marker) {
        unwrap_section(buffer, open_brace, close_brace, interior, opts.tag);
    } else {
        wrap_section(buffer, &def, open_brace, close_brace, interior, opts, source);
    }
    Ok(())
}

fn wrap_section(buffer: &mut TextBuffer, def: &Node<'_>, open_brace: usize, close_brace: usize, interior: &str, opts: &ToggleSection<'_>, source: &str) {
    let name = function_name(*def, source);
    let return_type = return_type_text(*def, source);
    let literal = opts.return_values.get(return_type.trim()).cloned().unwrap_or_else(|| default_return_for(&return_type));
    let debug_call = opts.debug_format.replace("{name}", &name);

    let replacement = format!(
        "\n#ifdef {tag}\n{interior}\n#else\n    {debug_call}\n    {literal}\n#endif // {tag}\n",
        tag = opts.tag,
        interior = interior.trim(),
    );
    buffer.delete_range(Position(open_brace + 1), Position(close_brace));
    buffer.insert_at_position(Position(open_brace + 1), &replacement);
}

fn unwrap_section(buffer: &mut TextBuffer, open_brace: usize, close_brace: usize, interior: &str, tag: &str) {
    let ifdef_marker = format!("#ifdef {tag}");
    let Some(ifdef_pos) = interior.find(&ifdef_marker) else { return };
    let Some(else_pos) = interior.find("#else") else { return };
    let original = interior[ifdef_pos + ifdef_marker.len()..else_pos].trim();

    let replacement = format!("\n{original}\n");
    buffer.delete_range(Position(open_brace + 1), Position(close_brace));
    buffer.insert_at_position(Position(open_brace + 1), &replacement);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_void_function_body() {
        let mut buffer = TextBuffer::from_str("void save() {\n    write();\n}\n");
        let return_values = HashMap::new();
        let opts = ToggleSection { tag: "KNUT_DEBUG", debug_format: "qDebug(\"{name}\");", return_values: &return_values };
        let offset = buffer.text().find("write").unwrap();
        toggle_section(&mut buffer, offset, &opts).unwrap();
        assert!(buffer.text().contains("#ifdef KNUT_DEBUG"));
        assert!(buffer.text().contains("write();"));
        assert!(buffer.text().contains("qDebug(\"save\");"));
        assert!(buffer.text().contains("return;"));
        assert!(buffer.text().contains("#endif // KNUT_DEBUG"));
    }

    #[test]
    fn unwraps_already_wrapped_function() {
        let mut buffer = TextBuffer::from_str(
            "void save() {\n#ifdef KNUT_DEBUG\n    write();\n#else\n    qDebug(\"save\");\n    return;\n#endif // KNUT_DEBUG\n}\n",
        );
        let return_values = HashMap::new();
        let opts = ToggleSection { tag: "KNUT_DEBUG", debug_format: "qDebug(\"{name}\");", return_values: &return_values };
        let offset = buffer.text().find("write").unwrap();
        toggle_section(&mut buffer, offset, &opts).unwrap();
        assert!(!buffer.text().contains("#ifdef"));
        assert!(buffer.text().contains("write();"));
    }
}

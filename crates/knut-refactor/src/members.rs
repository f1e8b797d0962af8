//! Add member/method declaration & definition, and the
//! `correspondingHeaderSource` heuristic (§4.H).

use std::path::{Path, PathBuf};

use knut_syntax::tree::{named_children, SourceLanguage, SyntaxTree};
use knut_text::{Position, TextBuffer};
use tree_sitter::Node;

use crate::error::RefactorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    fn label(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        }
    }
}

fn find_class_body<'a>(root: Node<'a>, source: &str, class_name: &str) -> Option<Node<'a>> {
    if matches!(root.kind(), "class_specifier" | "struct_specifier") {
        if let Some(name_node) = root.child_by_field_name("name") {
            if &source[name_node.start_byte()..name_node.end_byte()] == class_name {
                return root.child_by_field_name("body");
            }
        }
    }
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if let Some(found) = find_class_body(child, source, class_name) {
            return Some(found);
        }
    }
    None
}

fn indentation_of_line(source: &str, byte_offset: usize) -> String {
    let line_start = source[..byte_offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    source[line_start..byte_offset].chars().take_while(|c| c.is_whitespace()).collect()
}

/// §4.H "Add member / method declaration".
pub fn add_member_declaration(buffer: &mut TextBuffer, class_name: &str, access: Access, member: &str) -> Result<(), RefactorError> {
    let tree = SyntaxTree::new(buffer.text().to_string(), SourceLanguage::Cpp);
    let t = tree.tree();
    let Some(body) = find_class_body(t.root_node(), tree.source(), class_name) else {
        return Err(RefactorError::ClassNotFound(class_name.to_string()));
    };

    let children = named_children(body);
    let label = access.label();
    let mut last_in_section: Option<Node<'_>> = None;
    let mut in_section = false;
    for child in &children {
        if child.kind() == "access_specifier" {
            let text = &tree.source()[child.start_byte()..child.end_byte()];
            in_section = text.trim_start_matches(|c: char| !c.is_alphabetic()) == label;
            continue;
        }
        if in_section {
            last_in_section = Some(*child);
        }
    }

    if let Some(last) = last_in_section {
        let indent = indentation_of_line(tree.source(), last.start_byte());
        let insert_byte = line_end_byte(tree.source(), last.end_byte());
        buffer.insert_at_position(byte_to_position(tree.source(), insert_byte), &format!("{indent}{member}\n"));
    } else {
        let body_end = body.end_byte();
        let close_brace = tree.source()[..body_end].rfind('}').unwrap_or(body_end);
        let indent = "    ".to_string();
        buffer.insert_at_position(byte_to_position(tree.source(), close_brace), &format!("\n{label}:\n{indent}{member}\n"));
    }
    Ok(())
}

fn line_end_byte(source: &str, from: usize) -> usize {
    source[from..].find('\n').map(|i| from + i + 1).unwrap_or(source.len())
}

/// Converts a UTF-8 byte offset into `source` to the [`Position`] over a
/// buffer holding the same text (byte offsets coincide for ASCII/UTF-8
/// buffers since [`TextBuffer`] is itself byte-indexed).
fn byte_to_position(_source: &str, byte: usize) -> Position {
    Position(byte)
}

const DECLARATION_ONLY_MODIFIERS: &[&str] = &["override", "final", "virtual", "static", "Q_INVOKABLE", "Q_SLOT", "Q_SIGNAL"];

/// §4.H "Add method definition": strips declaration-only modifiers from a
/// signature and appends `"<return> <class>::<name>(<params>) { <body> }"`
/// after the last closing brace in the file.
pub fn add_method_definition(buffer: &mut TextBuffer, class_name: &str, signature: &str, body: &str) -> Result<(), RefactorError> {
    let mut cleaned = signature.to_string();
    for modifier in DECLARATION_ONLY_MODIFIERS {
        cleaned = cleaned.replace(modifier, "");
    }
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = cleaned.trim_end_matches(';').trim();

    let open_paren = cleaned.find('(').ok_or_else(|| RefactorError::MalformedSignature(signature.to_string()))?;
    let (before_params, params) = cleaned.split_at(open_paren);
    let last_space = before_params.trim_end().rfind(|c: char| c.is_whitespace() || c == '*' || c == '&');
    let (return_type, name) = match last_space {
        Some(i) => (before_params[..=i].trim(), before_params[i + 1..].trim()),
        None => ("", before_params.trim()),
    };

    let definition = if return_type.is_empty() {
        format!("{class_name}::{name}{params} {{ {body} }}\n")
    } else {
        format!("{return_type} {class_name}::{name}{params} {{ {body} }}\n")
    };

    let text = buffer.text();
    let insert_at = text.rfind('}').map(|i| i + 1).unwrap_or(text.len());
    buffer.insert_at_position(Position(insert_at), &format!("\n{definition}"));
    Ok(())
}

/// §4.H `correspondingHeaderSource`: prefer the same directory, matching
/// base name; otherwise the whole project, keeping the file whose path has
/// the longest common (case-insensitive) prefix with the current file.
pub fn corresponding_header_source(current: &Path, candidates: &[PathBuf], header_exts: &[&str], source_exts: &[&str]) -> Option<PathBuf> {
    let current_ext = current.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    let want_exts: &[&str] = if header_exts.iter().any(|e| *e == current_ext) { source_exts } else { header_exts };
    let base = current.file_stem()?.to_str()?.to_string();
    let dir = current.parent();

    if let Some(dir) = dir {
        if let Some(found) = candidates.iter().find(|c| {
            c.parent() == Some(dir)
                && c.file_stem().and_then(|s| s.to_str()) == Some(base.as_str())
                && want_exts.contains(&c.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase().as_str())
        }) {
            return Some(found.clone());
        }
    }

    let current_str = current.to_string_lossy().to_lowercase();
    candidates
        .iter()
        .filter(|c| want_exts.contains(&c.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase().as_str()))
        .max_by_key(|c| common_prefix_len(&current_str, &c.to_string_lossy().to_lowercase()))
        .cloned()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_member_to_existing_access_section() {
        let mut buffer = TextBuffer::from_str("class Widget {\npublic:\n    void paint();\n};\n");
        add_member_declaration(&mut buffer, "Widget", Access::Public, "void resize();").unwrap();
        assert!(buffer.text().contains("void paint();\n    void resize();\n"));
    }

    #[test]
    fn appends_new_access_section_when_missing() {
        let mut buffer = TextBuffer::from_str("class Widget {\n};\n");
        add_member_declaration(&mut buffer, "Widget", Access::Private, "int m_count;").unwrap();
        assert!(buffer.text().contains("private:\n    int m_count;"));
    }

    #[test]
    fn add_method_definition_strips_modifiers_and_appends() {
        let mut buffer = TextBuffer::from_str("class Widget {\n};\n");
        add_method_definition(&mut buffer, "Widget", "virtual void paint() override", "repaint();").unwrap();
        assert!(buffer.text().contains("void Widget::paint() { repaint(); }"));
    }

    #[test]
    fn corresponding_header_source_prefers_same_directory() {
        let current = PathBuf::from("/proj/src/widget.cpp");
        let candidates = vec![PathBuf::from("/proj/include/widget.h"), PathBuf::from("/proj/src/widget.h")];
        let found = corresponding_header_source(&current, &candidates, &["h", "hh", "hpp"], &["c", "cc", "cpp"]);
        assert_eq!(found, Some(PathBuf::from("/proj/src/widget.h")));
    }
}

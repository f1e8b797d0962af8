//! Change base class (§4.H): rewrites a header's base clause plus forward
//! declarations/includes of the old class name, and — in the matching
//! source file — the same rewrite plus a global and initializer-list-scoped
//! `OldName::` → `NewName::` replacement.

use knut_syntax::tree::{named_children, SourceLanguage, SyntaxTree};
use knut_text::{Position, TextBuffer};
use regex::Regex;
use tree_sitter::Node;

use crate::error::RefactorError;

fn forward_decl_regex(class_name: &str) -> Regex {
    Regex::new(&format!(r"\bclass\s+{}\s*;", regex::escape(class_name))).unwrap()
}

fn include_regex(class_name: &str) -> Regex {
    Regex::new(&format!(r#"#include\s*[<"]{}(\.h)?[>"]"#, regex::escape(class_name))).unwrap()
}

fn qualified_name_regex(class_name: &str) -> Regex {
    Regex::new(&format!(r"\b{}::", regex::escape(class_name))).unwrap()
}

fn find_base_clause<'a>(root: Node<'a>, source: &str, class_name: &str) -> Option<Node<'a>> {
    if root.kind() == "class_specifier" {
        if let Some(name_node) = root.child_by_field_name("name") {
            if &source[name_node.start_byte()..name_node.end_byte()] == class_name {
                return root.child_by_field_name("base_class_clause");
            }
        }
    }
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if let Some(found) = find_base_clause(child, source, class_name) {
            return Some(found);
        }
    }
    None
}

/// Replaces `old_name` with `new_name` in plain forward declarations and
/// `#include` lines naming the old class, line by line.
fn rewrite_includes_and_forward_decls(buffer: &mut TextBuffer, old_name: &str, new_name: &str) {
    let fwd = forward_decl_regex(old_name);
    let inc = include_regex(old_name);
    for line in (0..buffer.line_count()).rev() {
        let text = buffer.line_text(line).to_string();
        if fwd.is_match(&text) {
            let rewritten = text.replacen(old_name, new_name, 1);
            replace_line(buffer, line, &rewritten);
        } else if inc.is_match(&text) {
            let rewritten = text.replacen(old_name, new_name, 1);
            replace_line(buffer, line, &rewritten);
        }
    }
}

fn replace_line(buffer: &mut TextBuffer, line: usize, new_text: &str) {
    let start = buffer.line_start(line);
    let end = buffer.line_start(line + 1);
    let had_trailing_newline = buffer.text()[start.0..end.0].ends_with('\n');
    buffer.delete_range(start, end);
    let suffix = if had_trailing_newline { "\n" } else { "" };
    buffer.insert_at_position(start, &format!("{new_text}{suffix}"));
}

/// §4.H "Change base class" — header side: replaces the base clause text and
/// rewrites forward declarations / includes of the old base class name.
pub fn change_base_class_in_header(buffer: &mut TextBuffer, class_name: &str, old_base: &str, new_base: &str) -> Result<(), RefactorError> {
    let tree = SyntaxTree::new(buffer.text().to_string(), SourceLanguage::Cpp);
    let t = tree.tree();
    let clause = find_base_clause(t.root_node(), tree.source(), class_name).ok_or_else(|| RefactorError::ClassNotFound(class_name.to_string()))?;

    let source = tree.source();
    let clause_text = &source[clause.start_byte()..clause.end_byte()];
    let rewritten = clause_text.replacen(old_base, new_base, 1);
    buffer.delete_range(Position(clause.start_byte()), Position(clause.end_byte()));
    buffer.insert_at_position(Position(clause.start_byte()), &rewritten);

    rewrite_includes_and_forward_decls(buffer, old_base, new_base);
    Ok(())
}

/// §4.H "Change base class" — source side: the same include/forward-decl
/// rewrite, plus a global `OldBase::` → `NewBase::` replacement.
pub fn change_base_class_in_source(buffer: &mut TextBuffer, old_base: &str, new_base: &str) -> Result<(), RefactorError> {
    rewrite_includes_and_forward_decls(buffer, old_base, new_base);

    let re = qualified_name_regex(old_base);
    let mut matches: Vec<(usize, usize)> = re.find_iter(buffer.text()).map(|m| (m.start(), m.end())).collect();
    matches.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end) in matches {
        buffer.delete_range(Position(start), Position(end));
        buffer.insert_at_position(Position(start), &format!("{new_base}::"));
    }
    Ok(())
}

/// Rewrites only constructor initializer lists (each in the byte range
/// `[definition.start, body.start)`) from `OldBase(` to `NewBase(`.
pub fn rewrite_constructor_initializers(buffer: &mut TextBuffer, class_name: &str, old_base: &str, new_base: &str) -> Result<(), RefactorError> {
    let tree = SyntaxTree::new(buffer.text().to_string(), SourceLanguage::Cpp);
    let t = tree.tree();
    let ranges = constructor_ranges(t.root_node(), tree.source(), class_name);

    let old_call = format!("{old_base}(");
    let new_call = format!("{new_base}(");
    let mut edits: Vec<(usize, usize, String)> = Vec::new();
    for (start, end) in ranges {
        let segment = &tree.source()[start..end];
        if segment.contains(&old_call) {
            edits.push((start, end, segment.replace(&old_call, &new_call)));
        }
    }
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end, replacement) in edits {
        buffer.delete_range(Position(start), Position(end));
        buffer.insert_at_position(Position(start), &replacement);
    }
    Ok(())
}

fn constructor_ranges(root: Node<'_>, source: &str, class_name: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    collect_constructors(root, source, class_name, &mut out);
    out
}

fn collect_constructors(node: Node<'_>, source: &str, class_name: &str, out: &mut Vec<(usize, usize)>) {
    if node.kind() == "function_definition" {
        if let Some(declarator) = node.child_by_field_name("declarator") {
            let text = &source[declarator.start_byte()..declarator.end_byte()];
            if text.trim_start().starts_with(class_name) {
                if let Some(body) = node.child_by_field_name("body") {
                    out.push((node.start_byte(), body.start_byte()));
                }
            }
        }
    }
    for child in named_children(node) {
        collect_constructors(child, source, class_name, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_base_clause_and_include() {
        let mut buffer = TextBuffer::from_str("#include <Bar.h>\nclass Foo : public Bar {\n};\n");
        change_base_class_in_header(&mut buffer, "Foo", "Bar", "Baz").unwrap();
        assert!(buffer.text().contains("class Foo : public Baz {"));
        assert!(buffer.text().contains("#include <Baz.h>"));
    }

    #[test]
    fn rewrites_constructor_initializer_call() {
        let mut buffer = TextBuffer::from_str("class Foo : public Baz {\n    Foo(): Bar() {}\n};\n");
        rewrite_constructor_initializers(&mut buffer, "Foo", "Bar", "Baz").unwrap();
        assert!(buffer.text().contains("Foo(): Baz() {}"));
    }

    #[test]
    fn source_side_rewrites_qualified_names() {
        let mut buffer = TextBuffer::from_str("#include \"Bar.h\"\nint Bar::value() { return 1; }\n");
        change_base_class_in_source(&mut buffer, "Bar", "Baz").unwrap();
        assert!(buffer.text().contains("Baz::value"));
        assert!(buffer.text().contains("Baz.h"));
    }
}

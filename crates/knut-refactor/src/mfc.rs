//! MFC DDX and `MESSAGE_MAP` extraction (§4.H): both run a query for a
//! sequence of macro-call siblings bracketed by a `BEGIN_*`/`END_*` pair,
//! either at translation-unit top level or inside a namespace.

use knut_syntax::query::{run_query, QueryMatch};
use knut_syntax::tree::{named_children, SourceLanguage, SyntaxTree};
use tree_sitter::{Node, Query};

#[derive(Debug, Clone)]
pub struct DdxEntry {
    pub macro_name: String,
    pub text: String,
}

/// Finds the body of `DoDataExchange` and extracts every `DDX_*`/`DDV_*`
/// call inside it.
pub fn extract_ddx(source: &str) -> Vec<DdxEntry> {
    let tree = SyntaxTree::new(source.to_string(), SourceLanguage::Cpp);
    let t = tree.tree();
    let Some(body) = find_method_body(t.root_node(), tree.source(), "DoDataExchange") else {
        return Vec::new();
    };
    collect_macro_calls(body, tree.source(), &["DDX_", "DDV_"])
        .into_iter()
        .map(|(name, text)| DdxEntry { macro_name: name, text })
        .collect()
}

fn find_method_body<'a>(root: Node<'a>, source: &str, method_name: &str) -> Option<Node<'a>> {
    if root.kind() == "function_definition" {
        if let Some(declarator) = root.child_by_field_name("declarator") {
            if let Some(inner) = find_named_declarator(declarator) {
                let text = &source[inner.start_byte()..inner.end_byte()];
                if text == method_name || text.ends_with(&format!("::{method_name}")) {
                    return root.child_by_field_name("body");
                }
            }
        }
    }
    for child in named_children(root) {
        if let Some(found) = find_method_body(child, source, method_name) {
            return Some(found);
        }
    }
    None
}

fn find_named_declarator(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() == "function_declarator" {
        return node.child_by_field_name("declarator");
    }
    node.child_by_field_name("declarator").and_then(find_named_declarator)
}

/// Collects call expressions whose callee name starts with any of `prefixes`.
fn collect_macro_calls(node: Node<'_>, source: &str, prefixes: &[&str]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect_macro_calls_into(node, source, prefixes, &mut out);
    out
}

fn collect_macro_calls_into(node: Node<'_>, source: &str, prefixes: &[&str], out: &mut Vec<(String, String)>) {
    if node.kind() == "call_expression" {
        if let Some(function) = node.child_by_field_name("function") {
            let name = &source[function.start_byte()..function.end_byte()];
            if prefixes.iter().any(|p| name.starts_with(p)) {
                out.push((name.to_string(), source[node.start_byte()..node.end_byte()].to_string()));
            }
        }
    }
    for child in named_children(node) {
        collect_macro_calls_into(child, source, prefixes, out);
    }
}

#[derive(Debug, Clone)]
pub struct MessageMapEntry {
    pub class_name: String,
    pub super_class: String,
    pub handlers: Vec<String>,
}

/// Runs `query` (expected to capture `@class`, `@super`, and `@handler`
/// for each `ON_...` call between `BEGIN_MESSAGE_MAP`/`END_MESSAGE_MAP`)
/// against the whole file and assembles one [`MessageMapEntry`] per match
/// group sharing a `@class`/`@super` pair.
pub fn extract_message_maps(source: &str, query: &Query) -> Vec<MessageMapEntry> {
    let tree = SyntaxTree::new(source.to_string(), SourceLanguage::Cpp);
    let t = tree.tree();
    let matches = run_query(query, t.root_node(), tree.source());

    let mut entries: Vec<MessageMapEntry> = Vec::new();
    for m in &matches {
        let Some(class_name) = capture_text(m, "class", tree.source()) else { continue };
        let super_class = capture_text(m, "super", tree.source()).unwrap_or_default();
        let handlers: Vec<String> = m.captures.iter().filter(|c| c.name == "handler").map(|c| tree.source()[c.start_byte..c.end_byte].to_string()).collect();
        entries.push(MessageMapEntry { class_name, super_class, handlers });
    }
    entries
}

fn capture_text(m: &QueryMatch, name: &str, source: &str) -> Option<String> {
    m.captures.iter().find(|c| c.name == name).map(|c| source[c.start_byte..c.end_byte].to_string())
}

/// The standard message-map query pattern (§4.H), matching a
/// `BEGIN_MESSAGE_MAP(class, super)` call, zero or more `ON_...` handler
/// calls, and an `END_MESSAGE_MAP()` call as adjacent siblings, at
/// translation-unit top level or inside a namespace.
pub const MESSAGE_MAP_QUERY: &str = r#"
(
  (expression_statement (call_expression
    function: (identifier) @_begin
    arguments: (argument_list (identifier) @class (identifier) @super))) @begin
  .
  (expression_statement (call_expression
    function: (identifier) @handler)) @_entry
  .
  (expression_statement (call_expression
    function: (identifier) @_end)) @end
  (#eq? @_begin "BEGIN_MESSAGE_MAP")
  (#eq? @_end "END_MESSAGE_MAP")
)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ddx_calls_from_do_data_exchange() {
        let source = "void CDlg::DoDataExchange(CDataExchange* pDX) {\n    DDX_Text(pDX, IDC_NAME, m_name);\n    DDV_MaxChars(pDX, m_name, 50);\n}\n";
        let entries = extract_ddx(source);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].macro_name, "DDX_Text");
        assert_eq!(entries[1].macro_name, "DDV_MaxChars");
    }

    #[test]
    fn returns_empty_when_method_absent() {
        let source = "void CDlg::OnOK() {}\n";
        assert!(extract_ddx(source).is_empty());
    }
}

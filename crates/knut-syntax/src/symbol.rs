//! Symbol model (§4.F): a flat list of symbols produced by a language query,
//! then scope-qualified by a depth-first walk that tracks enclosing
//! class/struct definitions the way `SymbolHandler::findSymbols` pairs its
//! query results with the tree in the original implementation.

use tree_sitter::{Node, Query};

use crate::query::{run_query, QueryMatch};
use crate::tree::SyntaxTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Variable,
    Enum,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: (usize, usize),
    pub selection_range: (usize, usize),
    pub return_type: Option<String>,
    pub parameters: Option<String>,
}

/// Extracts symbols with `query`, then walks the tree to qualify each
/// symbol's name by its enclosing class/struct scope and promote functions
/// declared inside a class/struct scope to `Method`.
pub fn extract_symbols(tree: &SyntaxTree, query: &Query) -> Vec<Symbol> {
    let t = tree.tree();
    let root = t.root_node();
    let matches = run_query(query, root, tree.source());

    let mut symbols: Vec<Symbol> = matches
        .iter()
        .filter_map(|m| symbol_from_match(m, tree.source()))
        .collect();

    let mut scope_stack: Vec<(usize, usize, String)> = Vec::new();
    walk_scopes(root, tree.source(), &mut scope_stack, &mut symbols);
    symbols
}

fn symbol_from_match(m: &QueryMatch, source: &str) -> Option<Symbol> {
    let name_capture = m.captures.iter().find(|c| c.name == "name")?;
    let def_capture = m.captures.iter().find(|c| c.name.ends_with(".definition") || c.name == "definition").unwrap_or(name_capture);
    let kind = match def_capture.name.as_str() {
        s if s.contains("class") => SymbolKind::Class,
        s if s.contains("struct") => SymbolKind::Struct,
        s if s.contains("enum") => SymbolKind::Enum,
        s if s.contains("variable") || s.contains("field") => SymbolKind::Variable,
        _ => SymbolKind::Function,
    };
    let return_type = m.captures.iter().find(|c| c.name == "return-type").map(|c| source[c.start_byte..c.end_byte].to_string());
    let parameters = m.captures.iter().find(|c| c.name == "parameters").map(|c| source[c.start_byte..c.end_byte].to_string());
    Some(Symbol {
        name: source[name_capture.start_byte..name_capture.end_byte].to_string(),
        kind,
        range: (def_capture.start_byte, def_capture.end_byte),
        selection_range: (name_capture.start_byte, name_capture.end_byte),
        return_type,
        parameters,
    })
}

fn walk_scopes(node: Node<'_>, source: &str, scope_stack: &mut Vec<(usize, usize, String)>, symbols: &mut [Symbol]) {
    let is_type_def = matches!(node.kind(), "class_specifier" | "struct_specifier");
    let mut pushed = false;

    if is_type_def {
        if let Some(name_node) = node.child_by_field_name("name") {
            scope_stack.push((node.start_byte(), node.end_byte(), source[name_node.start_byte()..name_node.end_byte()].to_string()));
            pushed = true;
        }
    }

    for symbol in symbols.iter_mut() {
        if symbol.range.0 == node.start_byte() && symbol.range.1 == node.end_byte() {
            apply_scope(symbol, scope_stack);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_scopes(child, source, scope_stack, symbols);
    }

    if pushed {
        scope_stack.pop();
    }
}

fn apply_scope(symbol: &mut Symbol, scope_stack: &[(usize, usize, String)]) {
    if scope_stack.is_empty() {
        return;
    }
    let scope_path = scope_stack.iter().map(|(_, _, name)| name.as_str()).collect::<Vec<_>>().join("::");
    symbol.name = format!("{scope_path}::{}", symbol.name);
    if matches!(symbol.kind, SymbolKind::Function) {
        symbol.kind = SymbolKind::Method;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SourceLanguage;

    #[test]
    fn qualifies_method_with_enclosing_class_name() {
        let source = "class Widget { void paint() {} };";
        let tree = SyntaxTree::new(source, SourceLanguage::Cpp);
        let t = tree.tree();
        let query = Query::new(
            &tree.language().grammar(),
            "(function_definition declarator: (function_declarator declarator: (identifier) @name)) @definition",
        )
        .unwrap();
        let _ = t;
        let symbols = extract_symbols(&tree, &query);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Widget::paint");
        assert_eq!(symbols[0].kind, SymbolKind::Method);
    }
}

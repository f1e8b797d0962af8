//! Lazily (re)parsed Tree-sitter tree over a document's text (§4.D).
//!
//! The tree is dropped on any content change and reparsed on the next query,
//! mirroring `CodeDocument`'s treatment of its syntax tree in the original
//! implementation: cheap to discard, expensive to keep perfectly in sync
//! with incremental edits we don't otherwise track byte-for-byte.

use std::cell::RefCell;

use tree_sitter::{Language, Node, Parser, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Cpp,
    Rust,
}

impl SourceLanguage {
    pub fn grammar(self) -> Language {
        match self {
            SourceLanguage::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            SourceLanguage::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }
}

pub struct SyntaxTree {
    source: String,
    language: SourceLanguage,
    cached: RefCell<Option<Tree>>,
}

impl SyntaxTree {
    pub fn new(source: impl Into<String>, language: SourceLanguage) -> Self {
        Self { source: source.into(), language, cached: RefCell::new(None) }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    /// Replaces the buffer's text and invalidates the cached tree.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.invalidate();
    }

    pub fn invalidate(&self) {
        *self.cached.borrow_mut() = None;
    }

    /// Returns the current parse tree, reparsing from scratch if the last
    /// edit invalidated the cache.
    pub fn tree(&self) -> Tree {
        let mut cached = self.cached.borrow_mut();
        if cached.is_none() {
            let mut parser = Parser::new();
            parser.set_language(&self.language.grammar()).expect("grammar is ABI-compatible with this tree-sitter build");
            let tree = parser.parse(&self.source, None).expect("parser configured with a language always returns a tree");
            tracing::trace!(target: "syntax.tree", language = ?self.language, "reparsed");
            *cached = Some(tree);
        }
        cached.as_ref().unwrap().clone()
    }

    pub fn root(&self) -> Tree {
        self.tree()
    }
}

/// §4.D `node_at`: smallest node whose byte range contains `pos`.
pub fn node_at(root: Node<'_>, pos: usize) -> Option<Node<'_>> {
    if pos > root.end_byte() {
        return None;
    }
    Some(root.descendant_for_byte_range(pos, pos).unwrap_or(root))
}

/// §4.D `node_covering_range`: smallest node whose range fully contains
/// `[start, end]`.
pub fn node_covering_range(root: Node<'_>, start: usize, end: usize) -> Node<'_> {
    root.descendant_for_byte_range(start, end).unwrap_or(root)
}

/// §4.D `nodes_in_range`: all nodes fully inside `[start, end]`, deepest
/// first then left-to-right.
pub fn nodes_in_range<'a>(root: Node<'a>, start: usize, end: usize) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    collect_in_range(root, start, end, &mut out);
    out
}

fn collect_in_range<'a>(node: Node<'a>, start: usize, end: usize, out: &mut Vec<Node<'a>>) {
    if node.end_byte() < start || node.start_byte() > end {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_in_range(child, start, end, out);
    }
    if node.start_byte() >= start && node.end_byte() <= end {
        out.push(node);
    }
}

/// §4.D `named_children`.
pub fn named_children<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// §4.D `next_named_sibling`: walk named siblings, ascending when the
/// current level is exhausted.
pub fn next_named_sibling<'a>(mut node: Node<'a>) -> Option<Node<'a>> {
    loop {
        if let Some(sibling) = node.next_named_sibling() {
            return Some(sibling);
        }
        node = node.parent()?;
    }
}

/// §4.D `previous_named_sibling`: same, in reverse.
pub fn previous_named_sibling<'a>(mut node: Node<'a>) -> Option<Node<'a>> {
    loop {
        if let Some(sibling) = node.prev_named_sibling() {
            return Some(sibling);
        }
        node = node.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_for(source: &str) -> SyntaxTree {
        SyntaxTree::new(source, SourceLanguage::Cpp)
    }

    #[test]
    fn node_at_finds_identifier() {
        let tree = tree_for("int main() { return 0; }");
        let t = tree.tree();
        let root = t.root_node();
        let node = node_at(root, 4).unwrap();
        assert!(node.start_byte() <= 4 && node.end_byte() >= 4);
    }

    #[test]
    fn named_children_skips_anonymous_tokens() {
        let tree = tree_for("int main() { return 0; }");
        let t = tree.tree();
        let kids = named_children(t.root_node());
        assert!(!kids.is_empty());
        for kid in &kids {
            assert!(kid.is_named());
        }
    }

    #[test]
    fn invalidate_forces_reparse() {
        let mut tree = tree_for("int a = 1;");
        let _ = tree.tree();
        tree.set_source("int a = 1; int b = 2;");
        let after = tree.tree();
        assert_eq!(tree.source(), "int a = 1; int b = 2;");
        assert_eq!(after.root_node().named_child_count(), 2);
    }
}

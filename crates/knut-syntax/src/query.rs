//! Query layer (§4.D): a cached compiled [`Query`], executed through a
//! [`QueryCursor`], with built-in predicate evaluation (`#eq?`, `#not-eq?`,
//! `#match?`, `#like?`, `#exclude!`) applied the way the original
//! implementation's `QueryMatcher`/`Predicates` pair does it — tree-sitter
//! parses predicates into each pattern's argument list but never evaluates
//! them itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use knut_text::{Position, RangeMark, TextBuffer};
use regex::RegexBuilder;
use tree_sitter::{Node, Query, QueryCursor, QueryPredicateArg};

use crate::tree::SyntaxTree;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid tree-sitter query: {0}")]
    Invalid(#[from] tree_sitter::QueryError),
}

/// A parsed capture: its name and covered byte range.
#[derive(Debug, Clone)]
pub struct Capture {
    pub name: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub kind: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueryMatch {
    pub captures: Vec<Capture>,
}

impl QueryMatch {
    /// §4.D `get(name)`: the unique capture by that name, as a RangeMark.
    pub fn get(&self, name: &str, buffer: &mut TextBuffer) -> Option<RangeMark> {
        let capture = self.captures.iter().find(|c| c.name == name)?;
        Some(buffer.create_range_mark(Position(capture.start_byte), Position(capture.end_byte)))
    }

    /// §4.D `get_all(name)`.
    pub fn get_all(&self, name: &str, buffer: &mut TextBuffer) -> Vec<RangeMark> {
        self.captures
            .iter()
            .filter(|c| c.name == name)
            .map(|c| buffer.create_range_mark(Position(c.start_byte), Position(c.end_byte)))
            .collect()
    }

    fn capture_named(&self, name: &str) -> Option<&Capture> {
        self.captures.iter().find(|c| c.name == name)
    }
}

/// Caches compiled queries per document by source text, mirroring
/// `construct_query`'s per-document cache in the original implementation.
#[derive(Default)]
pub struct QueryCache {
    compiled: RefCell<HashMap<String, Rc<Query>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn construct_query(&self, tree: &SyntaxTree, source: &str) -> Result<Rc<Query>, QueryError> {
        if let Some(q) = self.compiled.borrow().get(source) {
            return Ok(q.clone());
        }
        let query = Rc::new(Query::new(&tree.language().grammar(), source)?);
        self.compiled.borrow_mut().insert(source.to_string(), query.clone());
        Ok(query)
    }
}

/// Runs `query` rooted at `node`, evaluating every pattern's built-in
/// predicates and dropping matches that fail any of them.
pub fn run_query(query: &Query, node: Node<'_>, source: &str) -> Vec<QueryMatch> {
    let mut cursor = QueryCursor::new();
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut matches = cursor.matches(query, node, bytes);
    while let Some(m) = matches.next() {
        if !predicates_hold(query, m.pattern_index, m, source) {
            continue;
        }
        let excluded_kinds = excluded_kinds_for(query, m.pattern_index);
        let captures = m
            .captures
            .iter()
            .filter(|c| !excluded_kinds.iter().any(|(cap_idx, kinds)| *cap_idx == c.index && kinds.contains(&c.node.kind().to_string())))
            .map(|c| Capture {
                name: query.capture_names()[c.index as usize].to_string(),
                start_byte: c.node.start_byte(),
                end_byte: c.node.end_byte(),
                kind: c.node.kind().to_string(),
            })
            .collect();
        out.push(QueryMatch { captures });
    }
    out
}

/// §4.D `query_in(capture, query)`: re-execute `sub_query` rooted at the
/// node captured by `capture_name` in `m`.
pub fn query_in(m: &QueryMatch, capture_name: &str, sub_query: &Query, tree: &SyntaxTree) -> Vec<QueryMatch> {
    let Some(capture) = m.capture_named(capture_name) else {
        return Vec::new();
    };
    let t = tree.tree();
    let root = t.root_node();
    let Some(node) = root.descendant_for_byte_range(capture.start_byte, capture.end_byte) else {
        return Vec::new();
    };
    run_query(sub_query, node, tree.source())
}

fn capture_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn predicates_hold(query: &Query, pattern_index: usize, m: &tree_sitter::QueryMatch<'_, '_>, source: &str) -> bool {
    for predicate in query.general_predicates(pattern_index) {
        let ok = match predicate.operator.as_ref() {
            "eq?" => eval_compare(predicate, m, source, |a, b| a == b),
            "not-eq?" => eval_compare(predicate, m, source, |a, b| a != b),
            "match?" => eval_match(predicate, m, source, false),
            "like?" => eval_match(predicate, m, source, true),
            _ => true,
        };
        if !ok {
            return false;
        }
    }
    true
}

fn arg_text<'a>(arg: &'a QueryPredicateArg, m: &tree_sitter::QueryMatch<'_, '_>, source: &'a str) -> Option<&'a str> {
    match arg {
        QueryPredicateArg::String(s) => Some(s),
        QueryPredicateArg::Capture(idx) => m.captures.iter().find(|c| c.index == *idx).map(|c| capture_text(c.node, source)),
    }
}

fn eval_compare(predicate: &tree_sitter::QueryPredicate, m: &tree_sitter::QueryMatch<'_, '_>, source: &str, cmp: impl Fn(&str, &str) -> bool) -> bool {
    if predicate.args.len() != 2 {
        return true;
    }
    let (Some(a), Some(b)) = (arg_text(&predicate.args[0], m, source), arg_text(&predicate.args[1], m, source)) else {
        return true;
    };
    cmp(a, b)
}

fn eval_match(predicate: &tree_sitter::QueryPredicate, m: &tree_sitter::QueryMatch<'_, '_>, source: &str, case_insensitive: bool) -> bool {
    if predicate.args.len() != 2 {
        return true;
    }
    let (Some(text), Some(pattern)) = (arg_text(&predicate.args[0], m, source), arg_text(&predicate.args[1], m, source)) else {
        return true;
    };
    match RegexBuilder::new(pattern).case_insensitive(case_insensitive).build() {
        Ok(re) => re.is_match(text),
        Err(err) => {
            tracing::warn!(target: "syntax.query", pattern, %err, "invalid #match?/#like? pattern");
            true
        }
    }
}

/// `#exclude!` args: `(capture, "Kind1", "Kind2", ...)` — returns
/// `(capture_index, kinds)` pairs for every such predicate on the pattern.
fn excluded_kinds_for(query: &Query, pattern_index: usize) -> Vec<(u32, Vec<String>)> {
    let mut out = Vec::new();
    for predicate in query.general_predicates(pattern_index) {
        if predicate.operator.as_ref() != "exclude!" || predicate.args.is_empty() {
            continue;
        }
        if let QueryPredicateArg::Capture(idx) = predicate.args[0] {
            let kinds = predicate.args[1..]
                .iter()
                .filter_map(|a| match a {
                    QueryPredicateArg::String(s) => Some(s.to_string()),
                    _ => None,
                })
                .collect();
            out.push((idx, kinds));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SourceLanguage;

    #[test]
    fn eq_predicate_filters_matches() {
        let tree = SyntaxTree::new("int a = 1; int a_a = 2;", SourceLanguage::Cpp);
        let t = tree.tree();
        let query = Query::new(
            &tree.language().grammar(),
            "(declaration declarator: (init_declarator declarator: (identifier) @name)) (#match? @name \"^a$\")",
        )
        .unwrap();
        let matches = run_query(&query, t.root_node(), tree.source());
        assert_eq!(matches.len(), 1);
        assert_eq!(&tree.source()[matches[0].captures[0].start_byte..matches[0].captures[0].end_byte], "a");
    }

    #[test]
    fn get_returns_range_mark_for_named_capture() {
        let tree = SyntaxTree::new("int a = 1;", SourceLanguage::Cpp);
        let t = tree.tree();
        let query = Query::new(&tree.language().grammar(), "(identifier) @name").unwrap();
        let matches = run_query(&query, t.root_node(), tree.source());
        let mut buffer = TextBuffer::from_str(tree.source());
        let mark = matches[0].get("name", &mut buffer).unwrap();
        assert!(mark.is_valid());
    }
}

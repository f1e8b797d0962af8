//! Selection navigation over named syntax nodes (§4.D
//! `selectLarger/Smaller/Next/PreviousSyntaxNode`).

use tree_sitter::Node;

use crate::tree::{next_named_sibling, previous_named_sibling};

/// *Larger*: climb `count` named ancestors. If `current` already exactly
/// spans `selection`, the first ascent still counts as one step; otherwise
/// the immediately containing named ancestor is the first step.
pub fn select_larger<'a>(current: Node<'a>, selection: (usize, usize), count: usize) -> Option<Node<'a>> {
    if count == 0 {
        return Some(current);
    }
    let exact = current.start_byte() == selection.0 && current.end_byte() == selection.1;
    let mut node = current;
    let mut remaining = count;
    if !exact {
        node = first_named_ancestor(node)?;
        remaining -= 1;
    }
    for _ in 0..remaining {
        node = first_named_ancestor(node)?;
    }
    Some(node)
}

fn first_named_ancestor(node: Node<'_>) -> Option<Node<'_>> {
    let mut cur = node.parent()?;
    while !cur.is_named() {
        cur = cur.parent()?;
    }
    Some(cur)
}

/// *Smaller*: descend to the first named child. If `current` already equals
/// `selection` exactly, skip one extra descent before returning.
pub fn select_smaller<'a>(current: Node<'a>, selection: (usize, usize)) -> Option<Node<'a>> {
    let exact = current.start_byte() == selection.0 && current.end_byte() == selection.1;
    let mut node = first_named_child(current)?;
    if exact {
        node = first_named_child(node)?;
    }
    Some(node)
}

fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).next()
}

/// *Next*: walk to the next named sibling, ascending when necessary.
pub fn select_next(current: Node<'_>) -> Option<Node<'_>> {
    next_named_sibling(current)
}

/// *Previous*: same, in reverse.
pub fn select_previous(current: Node<'_>) -> Option<Node<'_>> {
    previous_named_sibling(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{SourceLanguage, SyntaxTree};

    #[test]
    fn select_larger_climbs_one_ancestor_when_not_exact() {
        let tree = SyntaxTree::new("int main() { return 0; }", SourceLanguage::Cpp);
        let t = tree.tree();
        let root = t.root_node();
        let ident = root.descendant_for_byte_range(4, 4).unwrap();
        let larger = select_larger(ident, (4, 4), 1).unwrap();
        assert!(larger.start_byte() <= 4 && larger.end_byte() >= ident.end_byte());
        assert_ne!(larger.id(), ident.id());
    }

    #[test]
    fn select_next_ascends_when_no_sibling_at_level() {
        let tree = SyntaxTree::new("int a; int b;", SourceLanguage::Cpp);
        let t = tree.tree();
        let root = t.root_node();
        let first_decl = root.named_child(0).unwrap();
        let next = select_next(first_decl).unwrap();
        assert_ne!(next.id(), first_decl.id());
    }
}

//! C++ parse entry and tree helpers.
//!
//! The host parser is tree-sitter with the C++ grammar; the translator never
//! builds its own syntax tree, it only walks the one the oracle produces.

use arborium_tree_sitter::{Node, Parser, Tree};

use coropp_core::Span;

/// Parse C++ source into a tree-sitter tree.
pub fn parse(source: &str) -> Tree {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_cpp::language().into())
        .expect("failed to set language");
    parser.parse(source, None).expect("failed to parse source")
}

/// Byte span of a node.
#[inline]
pub fn span(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

/// Source text of a node.
#[inline]
pub fn text<'s>(node: Node<'s>, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

/// All children of a node, in order.
pub fn children(node: Node<'_>) -> Vec<Node<'_>> {
    (0..node.child_count()).filter_map(|i| node.child(i as u32)).collect()
}

/// Pre-order traversal of the subtree rooted at `node`, including `node`.
pub fn descendants(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        out.push(n);
        // Push in reverse so the traversal stays source-ordered.
        for i in (0..n.child_count()).rev() {
            if let Some(c) = n.child(i as u32) {
                stack.push(c);
            }
        }
    }
    out
}

/// Whether any ancestor of `node` (exclusive) has the given kind.
pub fn has_ancestor(node: Node<'_>, kind: &str) -> bool {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if n.kind() == kind {
            return true;
        }
        cur = n.parent();
    }
    false
}

/// Nearest ancestor (exclusive) of the given kind.
pub fn ancestor<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if n.kind() == kind {
            return Some(n);
        }
        cur = n.parent();
    }
    None
}

/// Spans of `ERROR` and missing nodes, used to surface parse failures.
pub fn parse_error_spans(tree: &Tree) -> Vec<Span> {
    descendants(tree.root_node())
        .into_iter()
        .filter(|n| n.is_error() || n.is_missing())
        .map(span)
        .collect()
}

/// Render the tree for `-v` dumps: named nodes with their ranges.
pub fn dump_tree(tree: &Tree, source: &str) -> String {
    let mut out = String::new();
    format_node(tree.root_node(), source, 0, &mut out);
    out
}

fn format_node(node: Node<'_>, source: &str, depth: usize, out: &mut String) {
    if node.is_named() {
        let snippet = one_line(text(node, source), 48);
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!(
            "{} [{}..{}] {}\n",
            node.kind(),
            node.start_byte(),
            node.end_byte(),
            snippet
        ));
    }
    for i in 0..node.child_count() {
        if let Some(c) = node.child(i as u32) {
            format_node(c, source, depth + usize::from(node.is_named()), out);
        }
    }
}

fn one_line(s: &str, max: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .take(max)
        .collect();
    if s.len() > max {
        format!("{flat}...")
    } else {
        flat
    }
}

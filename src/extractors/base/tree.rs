//! Tree navigation helpers shared by every extractor.

use tree_sitter::Node;

use crate::span::node_key;

/// Nesting depth past which the structural well-formedness check gives up
/// and reports the subtree as unhealthy. Generated and adversarial sources
/// can nest expressions thousands of levels deep; a record that deep is not
/// worth trusting anyway.
const MAX_SYNTAX_DEPTH: usize = 1_000;

/// All direct children of `node`, in order.
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    (0..node.child_count()).filter_map(|i| node.child(i)).collect()
}

/// Direct children whose kind is one of `kinds`.
pub fn children_of_type<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    children(node)
        .into_iter()
        .filter(|c| kinds.contains(&c.kind()))
        .collect()
}

/// Every node under `node` (itself excluded) whose kind is in `kinds`,
/// depth-first. The walk is iterative, so arbitrarily deep trees yield a
/// complete result rather than a stack overflow.
pub fn traverse_type<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack: Vec<Node<'t>> = children(node).into_iter().rev().collect();
    while let Some(next) = stack.pop() {
        if kinds.contains(&next.kind()) {
            out.push(next);
        }
        for child in children(next).into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

/// Two nodes are the same node iff they occupy the same span with the same
/// kind; node identity is not otherwise stable.
pub fn nodes_equal(a: &Node, b: &Node) -> bool {
    node_key(a) == node_key(b) && a.kind() == b.kind()
}

/// The sibling immediately before `node` among `parent`'s children, or
/// `None` when `node` is first (or not a child of `parent` at all).
pub fn previous_sibling<'t>(node: Node<'t>, parent: Node<'t>) -> Option<Node<'t>> {
    let siblings = children(parent);
    let index = siblings.iter().position(|c| nodes_equal(c, &node))?;
    if index == 0 {
        return None;
    }
    siblings.get(index - 1).copied()
}

/// Structural well-formedness of a subtree: no error nodes, no missing
/// nodes, and nesting within [`MAX_SYNTAX_DEPTH`]. Depth exhaustion is a
/// verdict (`false`), not a failure - extraction of sibling records
/// continues either way.
pub fn syntax_health(node: Node) -> bool {
    let mut stack: Vec<(Node, usize)> = vec![(node, 0)];
    while let Some((next, depth)) = stack.pop() {
        if depth > MAX_SYNTAX_DEPTH {
            return false;
        }
        if next.is_error() || next.is_missing() {
            return false;
        }
        for child in children(next) {
            stack.push((child, depth + 1));
        }
    }
    true
}

//! Byte-exact source access for one file under extraction.

use tree_sitter::{Node, Tree};

use crate::language::Language;
use crate::span::Span;

/// One immutable source file plus its parse tree. Owns no state beyond the
/// borrow; extractors build their per-file auxiliary maps around it and drop
/// everything when the file is done.
pub struct SourceFile<'t> {
    pub lang: Language,
    pub bytes: &'t [u8],
    pub root: Node<'t>,
}

impl<'t> SourceFile<'t> {
    pub fn new(lang: Language, bytes: &'t [u8], tree: &'t Tree) -> Self {
        Self {
            lang,
            bytes,
            root: tree.root_node(),
        }
    }

    /// Hex digest of the raw file bytes.
    pub fn file_hash(&self) -> String {
        blake3::hash(self.bytes).to_hex().to_string()
    }

    /// The exact bytes spanned by `node`.
    pub fn text(&self, node: &Node) -> String {
        self.slice(node.start_byte(), node.end_byte())
    }

    /// The exact bytes of `span`.
    pub fn span_text(&self, span: &Span) -> String {
        self.slice(span.start_byte, span.end_byte)
    }

    /// The contiguous span from the first node's start through the last
    /// node's end; empty for an empty slice.
    pub fn select(&self, nodes: &[Node]) -> String {
        match (nodes.first(), nodes.last()) {
            (Some(first), Some(last)) => self.slice(first.start_byte(), last.end_byte()),
            _ => String::new(),
        }
    }

    /// Each node's own text, in order.
    pub fn select_each(&self, nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(|n| self.text(n)).collect()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        if start > end || end > self.bytes.len() {
            return String::new();
        }
        String::from_utf8_lossy(&self.bytes[start..end]).into_owned()
    }
}

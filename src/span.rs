//! Byte-span and point model shared by every extracted record.
//!
//! Records are identified by `(start_byte, end_byte)` tuples rather than node
//! identity: spans are stable, comparable, and hashable regardless of how the
//! underlying tree represents nodes, so every auxiliary lookup map in the
//! extractors is keyed by [`SpanKey`].

use serde::de::Deserializer;
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// `(start_byte, end_byte)` key for per-file auxiliary maps.
pub type SpanKey = (usize, usize);

/// A `(row, col)` position. Serialized as a 2-tuple to match the schema
/// output shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<tree_sitter::Point> for Point {
    fn from(p: tree_sitter::Point) -> Self {
        Self {
            row: p.row,
            col: p.column,
        }
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.row)?;
        tup.serialize_element(&self.col)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (row, col) = <(usize, usize)>::deserialize(deserializer)?;
        Ok(Self { row, col })
    }
}

/// A contiguous source-byte range with its row/col endpoints.
///
/// Invariant: `start_byte <= end_byte`, and for any record carrying a span,
/// `source_bytes[start_byte..end_byte]` is exactly the record's
/// `original_string`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: Point,
    pub end_point: Point,
}

impl Span {
    pub fn of(node: &Node) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_point: node.start_position().into(),
            end_point: node.end_position().into(),
        }
    }

    /// Span covering `first`'s start through `last`'s end.
    pub fn between(first: &Node, last: &Node) -> Self {
        Self {
            start_byte: first.start_byte(),
            end_byte: last.end_byte(),
            start_point: first.start_position().into(),
            end_point: last.end_position().into(),
        }
    }

    pub fn key(&self) -> SpanKey {
        (self.start_byte, self.end_byte)
    }

    pub fn byte_span(&self) -> (usize, usize) {
        (self.start_byte, self.end_byte)
    }
}

/// Span-key of a node, for auxiliary map lookups.
pub fn node_key(node: &Node) -> SpanKey {
    (node.start_byte(), node.end_byte())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_serializes_as_tuple() {
        let p = Point::new(65, 4);
        assert_eq!(serde_json::to_string(&p).unwrap(), "[65,4]");
        let back: Point = serde_json::from_str("[65,4]").unwrap();
        assert_eq!(back, p);
    }
}

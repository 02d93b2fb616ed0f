//! Shared machinery for the per-language schema extractors.
//!
//! One extraction algorithm skeleton serves every language: locate candidate
//! nodes via the capability tables, resolve docstrings by sibling adjacency,
//! slice signatures and bodies by span, and recurse into bodies. The
//! submodules here hold everything that skeleton needs; the per-language
//! modules contribute only the traversal rules that genuinely diverge.

mod comments;
mod source;
mod tree;

pub use comments::{clean_hash_docstring, dedent, strip_c_style_delimiters};
pub use source::SourceFile;
pub use tree::{
    children, children_of_type, nodes_equal, previous_sibling, syntax_health, traverse_type,
};

/// Node-kind lists that parameterize the shared extraction skeleton for one
/// language. Pure data; no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageTables {
    pub method_types: &'static [&'static str],
    pub class_types: &'static [&'static str],
    pub import_types: &'static [&'static str],
    pub docstring_types: &'static [&'static str],
    pub namespace_types: &'static [&'static str],
    /// Kinds that end a statement for `<endofstatement>` marking, beyond any
    /// kind whose name already contains "statement".
    pub statement_types: &'static [&'static str],
}

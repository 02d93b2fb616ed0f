//! Uniform structural schema extraction from source code.
//!
//! Given a source file in any supported language, this crate produces two
//! independent views over its concrete syntax tree:
//!
//! - **Schema path**: [`extract_file_schema`] walks the tree into nested
//!   method/class records - names, verbatim spans, signatures, docstrings,
//!   default arguments, namespaces, visibility - identical in shape across
//!   all seven languages.
//! - **Normalization path**: [`normalize`] re-renders the token stream with
//!   comments handled by policy, literals replaced by kind-tagged
//!   placeholders, and optional `<INDENT>`/`<DEDENT>` tracking, for
//!   near-duplicate detection and feature datasets.
//!
//! Both paths are pure computation over one immutable tree at a time: no
//! I/O, no shared state, no panics on malformed input. Per-record trouble
//! degrades to empty strings or a false `syntax_pass`; whole-file
//! normalization trouble degrades to an empty string. Run extractions on
//! separate files in parallel by giving each its own call; only the
//! [`LiteralCounter`] lives across files, and merging its batches is the
//! caller's coordination point.
//!
//! ```no_run
//! use source_schema::{extract_file_schema, Language};
//!
//! let code = "def f(a, b=10):\n    return a\n";
//! let schema = extract_file_schema(code, Language::Python)?;
//! assert_eq!(schema.methods[0].default_arguments.get("b"), Some("10"));
//! # Ok::<(), source_schema::Error>(())
//! ```

pub mod error;
pub mod extractors;
pub mod language;
pub mod literals;
pub mod normalize;
pub mod schema;
pub mod span;
pub mod tokens;

pub use error::{Error, Result};
pub use extractors::{extract_file_schema, tables, LanguageTables};
pub use language::Language;
pub use literals::{
    literal_tables, LiteralCounter, LiteralCounts, LiteralTables, TopKeep, TopLiterals,
};
pub use normalize::{normalize, CommentPolicy, NormalizeOptions};
pub use schema::{
    ClassAttributes, ClassRecord, DefaultArgs, FieldRecord, FileSchema, MethodAttributes,
    MethodRecord, PropertyRecord,
};
pub use span::{Point, Span, SpanKey};
pub use tokens::{strip_comments, tokenize_file, whitespace_tokenize};

//! Library error taxonomy.
//!
//! Only hard failures surface here: an unknown language id, a grammar the
//! runtime refuses to load, a source string the parser cannot produce a tree
//! for at all, and I/O or JSON trouble while persisting literal counters.
//! Everything else (malformed subtrees, pathological nesting, normalization
//! trouble) degrades in place: empty strings, empty lists, or a false
//! `syntax_pass`, never an `Err`.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported language: '{0}'")]
    UnsupportedLanguage(String),

    #[error("failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("source could not be parsed")]
    Parse,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

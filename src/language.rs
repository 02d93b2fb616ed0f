//! Language support - shared tree-sitter language configuration.
//!
//! This is the single source of truth for the languages the crate can parse.
//! Grammar resolution, file-extension detection, and parser construction all
//! live here so no other module needs to know which grammar crate backs which
//! language id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tree_sitter::Parser;

use crate::error::{Error, Result};

/// Supported language identifiers.
///
/// JavaScript and TypeScript are distinct ids (distinct grammars, distinct
/// literal tables) but share one schema extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    TypeScript,
    Cpp,
    CSharp,
    Ruby,
}

impl Language {
    /// All supported languages, in a stable order.
    pub const ALL: [Language; 7] = [
        Language::Python,
        Language::Java,
        Language::JavaScript,
        Language::TypeScript,
        Language::Cpp,
        Language::CSharp,
        Language::Ruby,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
        }
    }

    /// Detect a language from a file extension (no leading dot).
    pub fn from_extension(extension: &str) -> Option<Language> {
        match extension {
            "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            "cs" => Some(Language::CSharp),
            "rb" => Some(Language::Ruby),
            _ => None,
        }
    }

    /// The compiled tree-sitter grammar for this language.
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        }
    }

    /// A parser pre-configured for this language.
    pub fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.grammar())?;
        Ok(parser)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "python" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "javascript" => Ok(Language::JavaScript),
            "typescript" => Ok(Language::TypeScript),
            "cpp" | "c++" => Ok(Language::Cpp),
            "csharp" | "c#" => Ok(Language::CSharp),
            "ruby" => Ok(Language::Ruby),
            other => Err(Error::UnsupportedLanguage(other.to_string())),
        }
    }
}

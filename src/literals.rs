//! Literal classification and corpus-scale frequency counting.
//!
//! Each language maps a handful of CST node kinds onto four literal kinds:
//! numeric, string, character, and pattern (regex). The [`LiteralCounter`]
//! accumulates how often each canonical literal value occurs across many
//! files; the top slice of that table feeds the normalizer so frequent
//! literals keep their value inside the placeholder (`<STR_LIT:utf-8>`)
//! while the long tail collapses to a bare `<STR_LIT>`.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::language::Language;
use crate::tokens::{collect_tokens, render_tokens};

/// Node kinds for the four literal kinds of one language. Lists may be empty
/// for kinds the language lacks (only JavaScript and TypeScript have regex
/// literals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralTables {
    pub number: &'static [&'static str],
    pub string: &'static [&'static str],
    pub character: &'static [&'static str],
    pub regex: &'static [&'static str],
}

pub const fn literal_tables(lang: Language) -> &'static LiteralTables {
    match lang {
        Language::Python => &LiteralTables {
            number: &["integer", "float"],
            string: &["string"],
            character: &[],
            regex: &[],
        },
        Language::Java => &LiteralTables {
            number: &[
                "decimal_floating_point_literal",
                "decimal_integer_literal",
                "hex_floating_point_literal",
                "hex_integer_literal",
                "octal_integer_literal",
                "binary_integer_literal",
            ],
            string: &["string_literal"],
            character: &["character_literal"],
            regex: &[],
        },
        Language::JavaScript | Language::TypeScript => &LiteralTables {
            number: &["number"],
            string: &["string", "template_string"],
            character: &[],
            regex: &["regex_pattern"],
        },
        Language::Cpp => &LiteralTables {
            number: &["number_literal"],
            string: &["string_literal", "raw_string_literal"],
            character: &["char_literal"],
            regex: &[],
        },
        Language::CSharp => &LiteralTables {
            number: &["integer_literal", "real_literal"],
            string: &["string_literal", "verbatim_string_literal"],
            character: &["character_literal"],
            regex: &[],
        },
        Language::Ruby => &LiteralTables {
            number: &["integer", "float"],
            string: &["string", "bare_string"],
            character: &[],
            regex: &[],
        },
    }
}

/// Token texts that look like literals but are type keywords in some
/// grammars; never replaced and never counted.
pub const LITERAL_KEYWORDS: [&str; 6] = ["int", "integer", "float", "string", "char", "character"];

/// Escape a canonical literal value so it is safe as a dictionary key in
/// downstream datasets (space and comma are column separators there).
pub fn escape_value(value: &str) -> String {
    value.replace(' ', "U+0020").replace(',', "U+002C")
}

const STRING_QUOTES: [&str; 4] = ["\"\"\"", "'''", "'", "\""];
const CHAR_QUOTES: [&str; 2] = ["'", "\""];

/// The content between the first opening occurrence of `quote` and the last
/// closing occurrence on the same line. Mirrors a lookaround regex scan: each
/// candidate opening position is tried left to right, and the first position
/// with a closing quote before the next line break wins. Multi-line literal
/// bodies therefore never match as a whole.
fn between_quotes(token: &str, quote: &str) -> Option<String> {
    let qlen = quote.len();
    if token.len() < qlen {
        return None;
    }
    let bytes = token.as_bytes();
    for end in qlen..=token.len() {
        if &bytes[end - qlen..end] != quote.as_bytes() {
            continue;
        }
        let window_end = token[end..]
            .find('\n')
            .map(|i| end + i)
            .unwrap_or(token.len());
        if let Some(j) = token[end..window_end].rfind(quote) {
            return Some(token[end..end + j].to_string());
        }
    }
    None
}

/// Canonical value of a string literal token, or `None` when no quote pair
/// is found (e.g. a multi-line body).
pub fn string_literal_value(token: &str) -> Option<String> {
    STRING_QUOTES.iter().find_map(|q| between_quotes(token, q))
}

/// Canonical value of a character literal token.
pub fn char_literal_value(token: &str) -> Option<String> {
    CHAR_QUOTES.iter().find_map(|q| between_quotes(token, q))
}

/// Frequency counters for one batch or one accumulated table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiteralCounts {
    #[serde(rename = "num")]
    pub number: HashMap<String, u64>,
    #[serde(rename = "str")]
    pub string: HashMap<String, u64>,
    #[serde(rename = "char")]
    pub character: HashMap<String, u64>,
    pub regex: HashMap<String, u64>,
}

impl LiteralCounts {
    pub fn is_empty(&self) -> bool {
        self.number.is_empty()
            && self.string.is_empty()
            && self.character.is_empty()
            && self.regex.is_empty()
    }

    fn merge(&mut self, other: &LiteralCounts) {
        for (map, incoming) in [
            (&mut self.number, &other.number),
            (&mut self.string, &other.string),
            (&mut self.character, &other.character),
            (&mut self.regex, &other.regex),
        ] {
            for (key, count) in incoming {
                *map.entry(key.clone()).or_insert(0) += count;
            }
        }
    }
}

/// High-frequency literal values per kind, consumed by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopLiterals {
    #[serde(rename = "num")]
    pub number: HashSet<String>,
    #[serde(rename = "str")]
    pub string: HashSet<String>,
    #[serde(rename = "char")]
    pub character: HashSet<String>,
    pub regex: HashSet<String>,
}

/// How many top values to keep per kind when building [`TopLiterals`].
#[derive(Debug, Clone, Copy)]
pub struct TopKeep {
    pub number: usize,
    pub string: usize,
    pub character: usize,
    pub regex: usize,
}

impl Default for TopKeep {
    fn default() -> Self {
        Self {
            number: 50,
            string: 100,
            character: 30,
            regex: 20,
        }
    }
}

/// Literal frequency table for one language with a lifecycle spanning many
/// files: count per file, merge batches, prune, persist as JSON.
///
/// This is the only stateful entity in the crate. Sharing one counter across
/// parallel workers needs external coordination; `update` is commutative and
/// associative, so partition-per-worker-then-merge is the intended pattern.
#[derive(Debug, Clone)]
pub struct LiteralCounter {
    lang: Language,
    token_limit: usize,
    max_value_len: usize,
    counts: LiteralCounts,
}

impl LiteralCounter {
    pub const DEFAULT_TOKEN_LIMIT: usize = 50_000;
    pub const DEFAULT_MAX_VALUE_LEN: usize = 25;

    pub fn new(lang: Language) -> Self {
        Self {
            lang,
            token_limit: Self::DEFAULT_TOKEN_LIMIT,
            max_value_len: Self::DEFAULT_MAX_VALUE_LEN,
            counts: LiteralCounts::default(),
        }
    }

    /// Cap on tokens per file; longer files are skipped outright.
    pub fn with_token_limit(mut self, token_limit: usize) -> Self {
        self.token_limit = token_limit;
        self
    }

    /// Cap on counted string/character value length; longer values (blobs,
    /// embedded data) are never counted.
    pub fn with_max_value_len(mut self, max_value_len: usize) -> Self {
        self.max_value_len = max_value_len;
        self
    }

    /// Load a previously saved table, falling back to empty counters when the
    /// file is missing or unreadable.
    pub fn load(lang: Language, path: &Path) -> Self {
        let counts = match fs::read_to_string(path)
            .map_err(crate::error::Error::from)
            .and_then(|text| serde_json::from_str(&text).map_err(crate::error::Error::from))
        {
            Ok(counts) => counts,
            Err(err) => {
                warn!("could not load literal counts from {:?}: {err}", path);
                LiteralCounts::default()
            }
        };
        let mut counter = Self::new(lang);
        counter.counts = counts;
        counter
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string(&self.counts)?)?;
        debug!("saved literal counts to {:?}", path);
        Ok(())
    }

    pub fn counts(&self) -> &LiteralCounts {
        &self.counts
    }

    /// Count the literals of one source snippet. Files that collapse to
    /// fewer than two lines, exceed the token limit, or fail to tokenize
    /// contribute nothing.
    pub fn count_literals(&self, code: &str) -> LiteralCounts {
        let mut out = LiteralCounts::default();
        if crate::normalize::collapse_blank_lines(code).matches('\n').count() < 2 {
            return out;
        }
        let mut parser = match self.lang.parser() {
            Ok(p) => p,
            Err(_) => return out,
        };
        let tree = match parser.parse(code, None) {
            Some(t) => t,
            None => return out,
        };
        let raw = collect_tokens(tree.root_node(), false, self.lang);
        if raw.len() > self.token_limit {
            return out;
        }
        let tokens = match render_tokens(code, &raw, true) {
            Some(t) => t,
            None => return out,
        };

        let tables = literal_tables(self.lang);
        for token in &tokens {
            if tables.number.contains(&token.kind) {
                *out.number.entry(token.text.clone()).or_insert(0) += 1;
            } else if tables.string.contains(&token.kind) {
                if let Some(value) = string_literal_value(&token.text) {
                    if !value.is_empty() && value.len() <= self.max_value_len {
                        *out.string.entry(escape_value(&value)).or_insert(0) += 1;
                    }
                }
            } else if tables.character.contains(&token.kind) {
                if let Some(value) = char_literal_value(&token.text) {
                    *out.character.entry(escape_value(&value)).or_insert(0) += 1;
                }
            } else if tables.regex.contains(&token.kind) {
                let text = &token.text;
                if !text.is_empty() && text.len() < self.max_value_len && !text.contains(' ') {
                    *out.regex.entry(text.clone()).or_insert(0) += 1;
                }
            }
        }
        out
    }

    /// Fold per-file batches into the table. Monotonic add.
    pub fn update(&mut self, batches: &[LiteralCounts]) {
        for batch in batches {
            self.counts.merge(batch);
        }
    }

    /// The high-frequency slice of the table, per kind.
    pub fn top(&self, keep: TopKeep) -> TopLiterals {
        TopLiterals {
            number: most_common(&self.counts.number, keep.number),
            string: most_common(&self.counts.string, keep.string),
            character: most_common(&self.counts.character, keep.character),
            regex: most_common(&self.counts.regex, keep.regex),
        }
    }

    /// Bound memory on corpus-scale runs: keep only the `keep_n` most
    /// frequent entries per kind and drop entries seen exactly once.
    pub fn prune(&mut self, keep_n: usize) {
        for map in [
            &mut self.counts.number,
            &mut self.counts.string,
            &mut self.counts.character,
            &mut self.counts.regex,
        ] {
            let mut entries: Vec<(String, u64)> = map.drain().collect();
            entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            entries.truncate(keep_n);
            map.extend(entries.into_iter().filter(|(_, count)| *count > 1));
        }
    }
}

fn most_common(map: &HashMap<String, u64>, keep: usize) -> HashSet<String> {
    let mut entries: Vec<(&String, &u64)> = map.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(keep)
        .map(|(k, _)| k.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_values() {
        assert_eq!(string_literal_value("'hello'").as_deref(), Some("hello"));
        assert_eq!(string_literal_value("\"hi\"").as_deref(), Some("hi"));
        assert_eq!(string_literal_value("'''doc'''").as_deref(), Some("doc"));
        assert_eq!(string_literal_value("f'x{y}'").as_deref(), Some("x{y}"));
        // multi-line bodies never match as a whole
        assert_ne!(
            string_literal_value("'''a\nb'''").as_deref(),
            Some("a\nb")
        );
    }

    #[test]
    fn escapes_separator_characters() {
        assert_eq!(escape_value("a b,c"), "aU+0020bU+002Cc");
    }

    #[test]
    fn counts_python_literals() {
        let counter = LiteralCounter::new(Language::Python);
        let counts = counter.count_literals("x = 10\ny = 'abc'\nz = 10\n");
        assert_eq!(counts.number.get("10"), Some(&2));
        assert_eq!(counts.string.get("abc"), Some(&1));
    }

    #[test]
    fn short_files_are_skipped() {
        let counter = LiteralCounter::new(Language::Python);
        assert!(counter.count_literals("x = 10").is_empty());
    }

    #[test]
    fn long_values_are_rejected() {
        let counter = LiteralCounter::new(Language::Python);
        let code = format!("x = '{}'\ny = 1\nz = 2\n", "a".repeat(40));
        let counts = counter.count_literals(&code);
        assert!(counts.string.is_empty());
    }

    #[test]
    fn update_is_commutative() {
        let counter = LiteralCounter::new(Language::Python);
        let a = counter.count_literals("x = 1\ny = 2\nz = 1\n");
        let b = counter.count_literals("p = 1\nq = 'v'\nr = 3\n");

        let mut left = LiteralCounter::new(Language::Python);
        left.update(&[a.clone(), b.clone()]);
        let mut right = LiteralCounter::new(Language::Python);
        right.update(&[b, a]);
        assert_eq!(left.counts(), right.counts());
    }

    #[test]
    fn prune_drops_singletons() {
        let mut counter = LiteralCounter::new(Language::Python);
        let batch = counter.count_literals("x = 1\ny = 1\nz = 7\n");
        counter.update(&[batch]);
        counter.prune(10);
        assert_eq!(counter.counts().number.get("1"), Some(&2));
        assert!(counter.counts().number.get("7").is_none());
    }

    #[test]
    fn saves_and_loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lits.json");

        let mut counter = LiteralCounter::new(Language::Python);
        let batch = counter.count_literals("x = 1\ny = 1\nz = 'v'\n");
        counter.update(&[batch]);
        counter.save(&path).unwrap();

        let loaded = LiteralCounter::load(Language::Python, &path);
        assert_eq!(loaded.counts(), counter.counts());

        // missing file falls back to empty counters
        let missing = LiteralCounter::load(Language::Python, &dir.path().join("nope.json"));
        assert!(missing.counts().is_empty());
    }

    #[test]
    fn top_returns_most_frequent() {
        let mut counter = LiteralCounter::new(Language::Python);
        let batch = counter.count_literals("a = 1\nb = 1\nc = 1\nd = 2\n");
        counter.update(&[batch]);
        let top = counter.top(TopKeep {
            number: 1,
            ..TopKeep::default()
        });
        assert!(top.number.contains("1"));
        assert!(!top.number.contains("2"));
    }
}

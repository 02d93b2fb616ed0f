//! Token-level source normalization.
//!
//! Turns a source snippet into a canonicalized text: comments removed,
//! normalized, or kept; literals replaced by kind-tagged placeholders
//! (`<NUM_LIT>`, `<STR_LIT:value>`, ...); optional `<INDENT>`/`<DEDENT>`
//! tracking against the file's inferred indentation unit; optional
//! `<endofstatement>` markers. The output is deterministic for a given
//! input, and any failure along the way (unparsable input, positions that
//! miss the source) yields an empty string rather than an error - callers
//! treat "" as "could not normalize".

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language::Language;
use crate::literals::{literal_tables, TopLiterals, LITERAL_KEYWORDS};
use crate::span::Point;
use crate::tokens::{collect_tokens, render_tokens, RawToken, Token, END_OF_STATEMENT};

static TRAILING_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n").unwrap());
static STR_QUALIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z]+|@)").unwrap());
static CHAR_QUALIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+").unwrap());

/// Collapse whitespace-only line tails: every `\s*\n` run becomes a single
/// newline. Shared with the literal counter's short-file check.
pub fn collapse_blank_lines(text: &str) -> String {
    TRAILING_BLANK.replace_all(text, "\n").into_owned()
}

/// What to do with comment tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentPolicy {
    /// Drop comments (a leading space survives so neighbors stay separated).
    #[default]
    Remove,
    /// Replace every comment with the fixed `#<COMMENT>` placeholder.
    Normalize,
    /// Keep comments verbatim.
    Keep,
}

/// Options for [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions<'a> {
    /// High-frequency literals that keep their value inside the placeholder.
    pub lits: Option<&'a TopLiterals>,
    pub comment: CommentPolicy,
    /// Track column deltas as `<INDENT>`/`<DEDENT>` placeholders.
    pub track_indent: bool,
    /// Emit `<endofstatement>` markers at statement boundaries.
    pub preserve_statement: bool,
    /// Caller-supplied replacements, keyed by raw token text (numeric/regex
    /// literals) or canonical value (string/character literals).
    pub token_overrides: Option<&'a HashMap<String, String>>,
    /// Characters converted to `U+XXXX` form inside literal values.
    pub special_chars: &'a [char],
}

impl<'a> NormalizeOptions<'a> {
    /// The common mining configuration: comments removed, indent tracked.
    pub fn mining() -> Self {
        Self {
            track_indent: true,
            ..Self::default()
        }
    }
}

/// Normalize `code`, returning the canonical text or `""` when the input
/// cannot be processed.
pub fn normalize(code: &str, lang: Language, opts: &NormalizeOptions) -> String {
    let mut parser = match lang.parser() {
        Ok(p) => p,
        Err(_) => return String::new(),
    };
    let tree = match parser.parse(code, None) {
        Some(t) => t,
        None => return String::new(),
    };

    let mut raw = collect_tokens(tree.root_node(), opts.preserve_statement, lang);
    merge_negative_numbers(&mut raw, literal_tables(lang).number);

    let tokens = match render_tokens(code, &raw, true) {
        Some(t) => t,
        None => return String::new(),
    };
    untokenize(&tokens, lang, opts)
}

/// Tokens whose kind marks the preceding token as a unary-minus context
/// rather than a binary subtraction.
fn is_numeric_operator(kind: &str) -> bool {
    matches!(
        kind,
        "=" | "==" | "===" | "!=" | "!==" | "+" | "-" | "*" | "/" | "%" | "!" | "not"
    )
}

/// Merge a `-` token directly followed by a numeric literal into one
/// negative-number token, but only when the token before the `-` reads as an
/// operator, comma, or opening bracket. `a - 3` stays a subtraction; in
/// `a = -3` the `-3` becomes one literal. A `-` at either end of the stream
/// never merges.
pub(crate) fn merge_negative_numbers(tokens: &mut Vec<RawToken>, number_kinds: &[&str]) {
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == "-" && i > 0 && i + 1 < tokens.len() {
            let next = tokens[i + 1];
            let prev = tokens[i - 1];
            if number_kinds.contains(&next.kind)
                && (is_numeric_operator(prev.kind) || matches!(prev.kind, "," | "(" | "{" | "["))
            {
                if let (Some((start, _)), Some((_, end))) = (tokens[i].span, next.span) {
                    tokens[i] = RawToken {
                        span: Some((start, end)),
                        kind: next.kind,
                    };
                    tokens.remove(i + 1);
                }
            }
        }
        i += 1;
    }
}

fn special_char_map(chars: &[char]) -> Vec<(char, String)> {
    chars
        .iter()
        .map(|&c| (c, format!("U+{:04X}", c as u32)))
        .collect()
}

fn apply_special_chars(value: &str, map: &[(char, String)]) -> String {
    let mut out = value.to_string();
    for (c, replacement) in map {
        out = out.replace(*c, replacement);
    }
    out
}

/// Split a literal token into (qualifier, opening quote, value, closing
/// quote). Qualifiers are the lowercase prefixes languages hang in front of
/// the quote (`r`, `f`, `b`, `u`, combinations) and C#'s `@`.
fn split_quoted(token: &str, qualifier_re: &Regex, quotes: &[&str]) -> (String, String, String, String) {
    let qualifier = qualifier_re
        .find(token)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let body = &token[qualifier.len()..];
    let mut start_quote = String::new();
    let mut end_quote = String::new();
    let mut value = body.to_string();
    for q in quotes {
        if body.starts_with(q) {
            start_quote = q.to_string();
            value = value[q.len()..].to_string();
            if body.ends_with(q) && body.len() >= 2 * q.len() {
                end_quote = q.to_string();
                value = value[..value.len() - q.len()].to_string();
            }
            break;
        }
    }
    (qualifier, start_quote, value, end_quote)
}

struct Renderer<'a> {
    lits: TopLiterals,
    opts: &'a NormalizeOptions<'a>,
    specials: Vec<(char, String)>,
}

impl<'a> Renderer<'a> {
    fn override_for(&self, key: &str) -> Option<String> {
        self.opts
            .token_overrides
            .and_then(|map| map.get(key).cloned())
    }

    fn render(&self, token: &Token, tables: &crate::literals::LiteralTables) -> String {
        let text = token.text.as_str();
        let kind = token.kind;

        if kind.contains("comment") {
            return match self.opts.comment {
                CommentPolicy::Normalize => "#<COMMENT>".to_string(),
                CommentPolicy::Keep => text.to_string(),
                CommentPolicy::Remove => {
                    if text.starts_with(' ') {
                        " ".to_string()
                    } else {
                        String::new()
                    }
                }
            };
        }
        if LITERAL_KEYWORDS.contains(&text) {
            return text.to_string();
        }

        if tables.regex.contains(&kind) {
            return self.override_for(text).unwrap_or_else(|| {
                if self.lits.regex.contains(text) {
                    format!("<REGEX_LIT:{text}>")
                } else {
                    "<REGEX_LIT>".to_string()
                }
            });
        }

        if tables.character.contains(&kind) {
            let (qualifier, start_quote, value, end_quote) =
                split_quoted(text, &CHAR_QUALIFIER, &["'", "\""]);
            let value = apply_special_chars(&value, &self.specials);
            if let Some(replacement) = self.override_for(&value) {
                return replacement;
            }
            return if self.lits.character.contains(&value) {
                format!("{qualifier}{start_quote}<CHAR_LIT:{value}>{end_quote}")
            } else {
                format!("{qualifier}{start_quote}<CHAR_LIT>{end_quote}")
            };
        }

        if tables.string.contains(&kind) {
            // C++ raw strings carry their own delimiters.
            let (qualifier, value) = if let Some(body) = text.strip_prefix("R\"(") {
                let body = body.strip_suffix(")\"").unwrap_or(body);
                ("R".to_string(), body.to_string())
            } else {
                let (qualifier, _, value, _) =
                    split_quoted(text, &STR_QUALIFIER, &["'''", "\"\"\"", "'", "\"", "`"]);
                (qualifier, value)
            };
            let value = apply_special_chars(&value, &self.specials);
            if let Some(replacement) = self.override_for(&value) {
                return replacement;
            }
            return if self.lits.string.contains(&value) {
                format!("{qualifier}<STR_LIT:{value}>")
            } else {
                format!("{qualifier}<STR_LIT>")
            };
        }

        if tables.number.contains(&kind) {
            return self.override_for(text).unwrap_or_else(|| {
                if self.lits.number.contains(text) {
                    format!("<NUM_LIT:{text}>")
                } else {
                    "<NUM_LIT>".to_string()
                }
            });
        }

        text.to_string()
    }
}

/// Reassemble rendered tokens into text: zero-gap tokens concatenate, a
/// same-row gap becomes one space, a row change becomes a newline plus either
/// indentation placeholders or literal leading spaces.
fn untokenize(tokens: &[Token], lang: Language, opts: &NormalizeOptions) -> String {
    let tables = literal_tables(lang);
    let renderer = Renderer {
        lits: opts.lits.cloned().unwrap_or_default(),
        opts,
        specials: special_char_map(opts.special_chars),
    };

    let mut out = String::new();
    let mut prev_sp: Option<Point> = None;
    let mut prev_ep = Point::default();
    let mut prev_indent = 0usize;
    let mut indent_size: Option<usize> = None;

    for token in tokens {
        if token.kind == "new_line" {
            out.push('\n');
            continue;
        }
        if token.kind == END_OF_STATEMENT {
            out.push_str(&token.text);
            continue;
        }
        let (sp, ep) = match token.span {
            Some(pair) => pair,
            None => continue,
        };
        let rendered = renderer.render(token, tables);

        if prev_sp.is_none() || sp == prev_ep {
            out.push_str(&rendered);
        } else if sp.row == prev_ep.row {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            out.push_str(&rendered);
        } else if opts.track_indent && !rendered.is_empty() {
            out.push('\n');
            if indent_size.is_none() && prev_indent == 0 && sp.col != prev_indent {
                indent_size = Some(sp.col);
            }
            let mut track = true;
            if sp.col > prev_indent {
                match indent_size {
                    Some(unit) if sp.col - prev_indent <= 2 * unit => {
                        let mut col = prev_indent;
                        while col < sp.col {
                            out.push_str("<INDENT>");
                            col += unit;
                        }
                    }
                    _ => {
                        // The jump is unreliable (or no unit is known yet);
                        // fall back to literal leading spaces and leave the
                        // tracked indent untouched for this transition.
                        track = false;
                        out.push_str(&" ".repeat(sp.col));
                    }
                }
            } else if sp.col < prev_indent {
                if let Some(unit) = indent_size {
                    let mut col = sp.col;
                    while col < prev_indent {
                        out.push_str("<DEDENT>");
                        col += unit;
                    }
                }
            }
            out.push_str(&rendered);
            if track {
                prev_indent = sp.col;
            }
        } else {
            out.push('\n');
            out.push_str(&" ".repeat(sp.col));
            out.push_str(&rendered);
        }

        prev_sp = Some(sp);
        prev_ep = ep;
    }

    collapse_blank_lines(out.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::tokenize_file;

    fn norm(code: &str, lang: Language) -> String {
        normalize(code, lang, &NormalizeOptions::mining())
    }

    #[test]
    fn replaces_literals_with_placeholders() {
        assert_eq!(norm("x = 1\n", Language::Python), "x = <NUM_LIT>\n");
        assert_eq!(norm("s = 'hi'\n", Language::Python), "s = <STR_LIT>\n");
    }

    #[test]
    fn frequent_literals_keep_their_value() {
        let mut lits = TopLiterals::default();
        lits.number.insert("1".to_string());
        lits.string.insert("hi".to_string());
        let opts = NormalizeOptions {
            lits: Some(&lits),
            track_indent: true,
            ..NormalizeOptions::default()
        };
        assert_eq!(
            normalize("x = 1\ns = 'hi'\ny = 2\n", Language::Python, &opts),
            "x = <NUM_LIT:1>\ns = <STR_LIT:hi>\ny = <NUM_LIT>\n"
        );
    }

    #[test]
    fn string_qualifiers_survive() {
        assert_eq!(norm("s = f'a{b}'\n", Language::Python), "s = f<STR_LIT>\n");
    }

    #[test]
    fn negative_number_merges_after_assignment() {
        let tokens = tokenize_file("a = -3", Language::Python);
        // tokenize_file does not merge; normalize does
        assert_eq!(tokens, vec!["a", "=", "-", "3"]);
        assert_eq!(norm("a = -3\n", Language::Python), "a = <NUM_LIT>\n");
    }

    #[test]
    fn subtraction_does_not_merge() {
        assert_eq!(norm("x = a - 3\n", Language::Python), "x = a - <NUM_LIT>\n");
    }

    #[test]
    fn merged_negative_literal_keeps_its_sign() {
        let mut lits = TopLiterals::default();
        lits.number.insert("-3".to_string());
        let opts = NormalizeOptions {
            lits: Some(&lits),
            track_indent: true,
            ..NormalizeOptions::default()
        };
        assert_eq!(
            normalize("a = -3\n", Language::Python, &opts),
            "a = <NUM_LIT:-3>\n"
        );
    }

    #[test]
    fn tracks_indentation() {
        assert_eq!(
            norm("def f():\n    return 1\n", Language::Python),
            "def f():\n<INDENT>return <NUM_LIT>\n"
        );
    }

    #[test]
    fn dedent_after_nested_block() {
        // one placeholder per unit of column delta
        let code = "def f():\n    if x:\n        return 1\n    return 2\n";
        assert_eq!(
            norm(code, Language::Python),
            "def f():\n<INDENT>if x:\n<INDENT>return <NUM_LIT>\n<DEDENT>return <NUM_LIT>\n"
        );
    }

    #[test]
    fn comment_policies() {
        let code = "x = 1  # note\n";
        assert_eq!(norm(code, Language::Python), "x = <NUM_LIT>\n");
        let normalized = normalize(
            code,
            Language::Python,
            &NormalizeOptions {
                comment: CommentPolicy::Normalize,
                track_indent: true,
                ..NormalizeOptions::default()
            },
        );
        assert_eq!(normalized, "x = <NUM_LIT> #<COMMENT>\n");
        let kept = normalize(
            code,
            Language::Python,
            &NormalizeOptions {
                comment: CommentPolicy::Keep,
                track_indent: true,
                ..NormalizeOptions::default()
            },
        );
        assert_eq!(kept, "x = <NUM_LIT> # note\n");
    }

    #[test]
    fn token_overrides_win() {
        let mut overrides = HashMap::new();
        overrides.insert("1".to_string(), "<ONE>".to_string());
        let opts = NormalizeOptions {
            token_overrides: Some(&overrides),
            track_indent: true,
            ..NormalizeOptions::default()
        };
        assert_eq!(normalize("x = 1\n", Language::Python, &opts), "x = <ONE>\n");
    }

    #[test]
    fn special_chars_convert_to_unicode_form() {
        let opts = NormalizeOptions {
            special_chars: &[' '],
            track_indent: true,
            ..NormalizeOptions::default()
        };
        let mut lits = TopLiterals::default();
        lits.string.insert("aU+0020b".to_string());
        let opts = NormalizeOptions {
            lits: Some(&lits),
            ..opts
        };
        assert_eq!(
            normalize("s = 'a b'\n", Language::Python, &opts),
            "s = <STR_LIT:aU+0020b>\n"
        );
    }

    #[test]
    fn type_keywords_are_never_replaced() {
        // `int` parses as an identifier but guards the literal branch anyway;
        // a string containing exactly a keyword is also left alone.
        assert_eq!(
            norm("x = 'int'\n", Language::Python),
            "x = <STR_LIT>\n" // quoted value is "int" but token text is 'int'
        );
    }

    #[test]
    fn statement_markers_are_emitted() {
        let opts = NormalizeOptions {
            preserve_statement: true,
            track_indent: true,
            ..NormalizeOptions::default()
        };
        let out = normalize("using System;\n", Language::CSharp, &opts);
        assert!(out.contains("<endofstatement>"));
    }

    #[test]
    fn javascript_regex_literal() {
        let out = norm("const r = /ab+/;\n", Language::JavaScript);
        assert!(out.contains("<REGEX_LIT>"), "got: {out}");
    }

    #[test]
    fn deterministic() {
        let code = "def f(a):\n    return a + 1\n";
        assert_eq!(norm(code, Language::Python), norm(code, Language::Python));
    }

    #[test]
    fn empty_input_normalizes_to_empty() {
        assert_eq!(norm("", Language::Python), "");
    }

    #[test]
    fn csharp_verbatim_string_keeps_qualifier() {
        let out = norm("class A { string s = @\"p\\x\"; }\n", Language::CSharp);
        assert!(out.contains("@<STR_LIT>"), "got: {out}");
    }
}

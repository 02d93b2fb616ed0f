//! Leaf-token collection over a concrete syntax tree.
//!
//! The collector performs a left-to-right depth-first walk and emits one
//! token per leaf node. String- and character-literal nodes are treated as
//! atomic even though the grammar decomposes them (quotes, escape sequences,
//! interpolations): a node whose kind mentions `string` or `char` becomes a
//! single token spanning its first through last child. Concatenated /
//! chained string forms are the exception and are descended into normally.
//!
//! The walk is iterative over an explicit stack, so it terminates on any
//! finite tree regardless of nesting depth.

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use crate::extractors::tables;
use crate::language::Language;
use crate::span::Point;

/// Composite string forms that must be descended into rather than collapsed
/// to one token.
pub const COMPOUND_STRING_KINDS: [&str; 3] = ["concatenated_string", "string_array", "chained_string"];

/// Kind tag of the synthetic statement-boundary marker.
pub const END_OF_STATEMENT: &str = "endofstatement";

/// Rendered form of the statement-boundary marker.
pub const END_OF_STATEMENT_TOKEN: &str = "<endofstatement>";

static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*\*/").unwrap());

/// A collected token: a `(start, end)` point pair and the node kind, or a
/// statement-boundary marker (`span == None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken {
    pub span: Option<(Point, Point)>,
    pub kind: &'static str,
}

impl RawToken {
    fn marker() -> Self {
        Self {
            span: None,
            kind: END_OF_STATEMENT,
        }
    }

    pub fn is_marker(&self) -> bool {
        self.span.is_none()
    }
}

/// Whether `node` is emitted as one atomic token.
fn is_atomic(node: &Node) -> bool {
    if node.child_count() == 0 {
        return true;
    }
    let kind = node.kind();
    (kind.contains("string") && !COMPOUND_STRING_KINDS.contains(&kind)) || kind.contains("char")
}

/// Collect all leaf tokens under `node`, depth-first, left-to-right.
///
/// With `preserve_statement`, a marker token is emitted after every child
/// whose kind mentions `statement` or appears in the language's statement
/// table, but never twice in a row.
pub fn collect_tokens(node: Node, preserve_statement: bool, lang: Language) -> Vec<RawToken> {
    let statement_kinds = tables(lang).statement_types;
    let mut out = Vec::new();

    enum Item<'t> {
        Visit(Node<'t>),
        Marker,
    }

    let mut stack = vec![Item::Visit(node)];
    while let Some(item) = stack.pop() {
        match item {
            Item::Marker => {
                if out.last().map(|t: &RawToken| t.kind) != Some(END_OF_STATEMENT) {
                    out.push(RawToken::marker());
                }
            }
            Item::Visit(n) => {
                if n.child_count() == 0 {
                    out.push(RawToken {
                        span: Some((n.start_position().into(), n.end_position().into())),
                        kind: n.kind(),
                    });
                    continue;
                }
                if is_atomic(&n) {
                    let first = n.child(0).expect("non-leaf node has a first child");
                    let last = n.child(n.child_count() - 1).expect("non-leaf node has a last child");
                    out.push(RawToken {
                        span: Some((first.start_position().into(), last.end_position().into())),
                        kind: n.kind(),
                    });
                    continue;
                }
                // Reverse push so children pop left-to-right; a child's marker
                // sits below its subtree and surfaces right after it.
                for i in (0..n.child_count()).rev() {
                    let child = n.child(i).expect("child index in range");
                    if preserve_statement
                        && (child.kind().contains("statement")
                            || statement_kinds.contains(&child.kind()))
                    {
                        stack.push(Item::Marker);
                    }
                    stack.push(Item::Visit(child));
                }
            }
        }
    }
    out
}

/// A rendered token: decoded text plus the raw kind and position. Newline
/// pseudo-tokens (`kind == "new_line"`) and statement markers carry no
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: &'static str,
    pub span: Option<(Point, Point)>,
}

/// Decode raw tokens against the source text, interleaving newline
/// pseudo-tokens whenever the row advances.
///
/// Multi-line tokens are decoded with their line breaks elided, matching the
/// line-table reconstruction this is modeled on. `preproc_arg` tokens (the
/// tail of C/C++ `#define`s) get `//` and `/* */` comments scrubbed since the
/// grammar lumps them into one blob. Returns `None` when a token's recorded
/// position does not land inside the source (the caller treats the stream as
/// unusable).
pub fn render_tokens(code: &str, raw: &[RawToken], keep_newline: bool) -> Option<Vec<Token>> {
    fn line_slice<'a>(lines: &[&'a [u8]], row: usize, lo: usize, hi: usize) -> Option<&'a [u8]> {
        let line = lines.get(row)?;
        if lo > hi || hi > line.len() {
            return None;
        }
        Some(&line[lo..hi])
    }

    let lines: Vec<&[u8]> = code.as_bytes().split(|&b| b == b'\n').collect();
    let mut out: Vec<Token> = Vec::with_capacity(raw.len());
    let mut prev_line = 0usize;

    for token in raw {
        let (sp, ep) = match token.span {
            None => {
                out.push(Token {
                    text: END_OF_STATEMENT_TOKEN.to_string(),
                    kind: END_OF_STATEMENT,
                    span: None,
                });
                continue;
            }
            Some(pair) => pair,
        };

        if sp.row != prev_line && keep_newline {
            out.push(Token {
                text: "\n".to_string(),
                kind: "new_line",
                span: None,
            });
        }
        prev_line = ep.row;

        let text = if sp.row == ep.row {
            String::from_utf8_lossy(line_slice(&lines, sp.row, sp.col, ep.col)?).into_owned()
        } else {
            let mut bytes = line_slice(&lines, sp.row, sp.col, lines.get(sp.row)?.len())?.to_vec();
            for row in sp.row + 1..ep.row {
                bytes.extend_from_slice(lines.get(row)?);
            }
            bytes.extend_from_slice(line_slice(&lines, ep.row, 0, ep.col)?);
            String::from_utf8_lossy(&bytes).into_owned()
        };

        let text = if token.kind == "preproc_arg" {
            let uncommented = text.split("//").next().unwrap_or("").to_string();
            BLOCK_COMMENT.replace_all(&uncommented, "").into_owned()
        } else {
            text
        };

        out.push(Token {
            text,
            kind: token.kind,
            span: Some((sp, ep)),
        });
    }

    // A source that ends in a blank line gets a closing newline token.
    if keep_newline
        && !out.is_empty()
        && lines
            .last()
            .map(|l| l.iter().all(|b| b.is_ascii_whitespace()))
            .unwrap_or(false)
        && out.last().map(|t| t.text.as_str()) != Some("\n")
    {
        out.push(Token {
            text: "\n".to_string(),
            kind: "new_line",
            span: None,
        });
    }

    Some(out)
}

/// Tokenize a source snippet (a file, a method, anything the grammar can
/// parse) into its token texts. Returns an empty list when the input cannot
/// be tokenized.
pub fn tokenize_file(code: &str, lang: Language) -> Vec<String> {
    let mut parser = match lang.parser() {
        Ok(p) => p,
        Err(_) => return Vec::new(),
    };
    let tree = match parser.parse(code, None) {
        Some(t) => t,
        None => return Vec::new(),
    };
    let raw = collect_tokens(tree.root_node(), false, lang);
    match render_tokens(code, &raw, false) {
        Some(tokens) => tokens.into_iter().map(|t| t.text).collect(),
        None => Vec::new(),
    }
}

/// Leaf tokens of `node` with the whitespace to the right of each token
/// attached, the first token left-padded to its start column. Used by
/// [`strip_comments`] and by whitespace-sensitive consumers.
pub fn whitespace_tokenize(file_bytes: &[u8], node: Node) -> (Vec<String>, Vec<&'static str>) {
    let n_bytes = file_bytes.len();
    let mut tokens = Vec::new();
    let mut types = Vec::new();

    let mut stack: Vec<Node> = (0..node.child_count())
        .rev()
        .filter_map(|i| node.child(i))
        .collect();
    while let Some(next) = stack.pop() {
        if next.child_count() == 0 || is_atomic(&next) {
            let start = next.start_byte();
            let mut finish = next.end_byte();
            while finish < n_bytes && file_bytes[finish].is_ascii_whitespace() {
                finish += 1;
            }
            let mut tok =
                String::from_utf8_lossy(&file_bytes[start.min(n_bytes)..finish.min(n_bytes)])
                    .into_owned();
            if tokens.is_empty() {
                // indent the first token to maintain relative space
                tok = " ".repeat(next.start_position().column) + &tok;
            }
            tokens.push(tok);
            types.push(next.kind());
            continue;
        }
        for i in (0..next.child_count()).rev() {
            if let Some(child) = next.child(i) {
                stack.push(child);
            }
        }
    }
    (tokens, types)
}

/// Comment-free rendition of the source under `node`, preserving the line
/// structure (a comment's trailing newline survives, its text does not).
pub fn strip_comments(file_bytes: &[u8], node: Node) -> String {
    let (tokens, types) = whitespace_tokenize(file_bytes, node);
    let mut out = String::new();
    for (tok, typ) in tokens.iter().zip(types.iter()) {
        if typ.contains("comment") {
            match tok.find('\n') {
                Some(i) => out.push_str(&tok[i..]),
                None => {}
            }
        } else {
            out.push_str(tok);
        }
    }
    out
}

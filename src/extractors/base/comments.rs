//! Docstring and comment-delimiter cleanup.
//!
//! Two comment families cover all supported languages: hash-style (`#`,
//! Python/Ruby) and C-style (`//`, `/* */`, `///`). Cleaners strip the
//! delimiters while preserving the comment's own line structure.

/// Remove the common leading whitespace of all non-blank lines.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    if margin == 0 {
        return text.to_string();
    }
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.trim_start()
            } else {
                line.get(margin..).unwrap_or_else(|| line.trim_start())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clean a hash-style docstring/comment: trim surrounding quotes and
/// whitespace, drop leading `#` runs per line, dedent.
pub fn clean_hash_docstring(comment: &str) -> String {
    let trimmed = comment.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    let unhashed = trimmed
        .lines()
        .map(|line| line.trim_start_matches('#'))
        .collect::<Vec<_>>()
        .join("\n");
    dedent(&unhashed)
}

/// Strip C-style comment delimiters line by line, keeping interior
/// indentation after the delimiter.
pub fn strip_c_style_delimiters(comment: &str) -> String {
    let mut cleaned = Vec::new();
    for line in comment.lines() {
        let mut line = line.trim_start();
        if let Some(rest) = line.strip_suffix(" */") {
            line = rest;
        } else if let Some(rest) = line.strip_suffix("*/") {
            line = rest;
        }
        let line = if let Some(rest) = line.strip_prefix("* ") {
            rest
        } else if let Some(rest) = line.strip_prefix("/**") {
            rest
        } else if let Some(rest) = line.strip_prefix("/*") {
            rest
        } else if let Some(rest) = line.strip_prefix("///") {
            rest
        } else if let Some(rest) = line.strip_prefix("//") {
            rest
        } else if let Some(rest) = line.strip_prefix("*") {
            rest
        } else {
            line
        };
        cleaned.push(line);
    }
    cleaned.join("\n")
}

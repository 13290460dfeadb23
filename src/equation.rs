//! Splitting text into prose and `$`-delimited equations.
//!
//! `$$...$$` marks a display equation and `$...$` an inline one. Delimiters
//! do not nest and cannot be escaped; the content between them must be
//! non-empty. An opening delimiter with no closer is ordinary text.
//!
//! Each equation ends at the first closing delimiter rather than the last,
//! so `$$a$$ b $$c$$` is two display equations and not one greedy run from
//! the first `$$` to the final one.

use serde::Serialize;

/// A run of text or an equation between delimiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "source", rename_all = "lowercase")]
pub enum EquationPart {
    Text(String),
    Inline(String),
    Display(String),
}

impl EquationPart {
    /// The part as it appeared in the source, delimiters included.
    pub fn source(&self) -> String {
        match self {
            EquationPart::Text(text) => text.clone(),
            EquationPart::Inline(eq) => format!("${eq}$"),
            EquationPart::Display(eq) => format!("$${eq}$$"),
        }
    }

    pub fn is_equation(&self) -> bool {
        !matches!(self, EquationPart::Text(_))
    }
}

/// Split text into prose and equations, in source order.
pub fn split(text: &str) -> Vec<EquationPart> {
    let mut parts = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('$') {
        let at = cursor + offset;
        match equation_at(&text[at..]) {
            Some((part, len)) => {
                if text_start < at {
                    parts.push(EquationPart::Text(text[text_start..at].to_string()));
                }
                parts.push(part);
                cursor = at + len;
                text_start = cursor;
            }
            None => cursor = at + 1,
        }
    }

    if text_start < text.len() {
        parts.push(EquationPart::Text(text[text_start..].to_string()));
    }

    parts
}

/// Match an equation at the start of `text`, which begins with `$`.
/// Returns the part and the number of bytes it spans.
fn equation_at(text: &str) -> Option<(EquationPart, usize)> {
    if let Some(body) = text.strip_prefix("$$") {
        if let Some(end) = closing(body, "$$") {
            return Some((EquationPart::Display(body[..end].to_string()), end + 4));
        }
    }

    let body = text.strip_prefix('$')?;
    let end = closing(body, "$")?;
    Some((EquationPart::Inline(body[..end].to_string()), end + 2))
}

/// Position of the first `delimiter` in `body` after at least one character.
fn closing(body: &str, delimiter: &str) -> Option<usize> {
    let first = body.chars().next()?;
    let from = first.len_utf8();
    body[from..].find(delimiter).map(|pos| from + pos)
}

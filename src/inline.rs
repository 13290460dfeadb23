use crate::block::Span;

const BOLD: &str = "**";

/// Split a line into plain and bold spans.
///
/// A bold run is `**`, at least one character, then the next `**`. Runs are
/// matched left to right, shortest first, and never nest. A `**` that cannot
/// be closed stays literal. Empty text between runs is not emitted.
pub fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = line;

    while let Some((before, bold, after)) = next_bold(rest) {
        if !before.is_empty() {
            spans.push(Span::Text(before.to_string()));
        }
        spans.push(Span::Bold(bold.to_string()));
        rest = after;
    }

    if !rest.is_empty() {
        spans.push(Span::Text(rest.to_string()));
    }

    spans
}

/// Find the first bold run, returning (text before, bold content, remainder).
///
/// Only the first opening delimiter needs to be tried: any closer reachable
/// from a later opener is also reachable from the first one.
fn next_bold(text: &str) -> Option<(&str, &str, &str)> {
    let open = text.find(BOLD)?;
    let inner = open + BOLD.len();
    let first = text[inner..].chars().next()?;
    let search_from = inner + first.len_utf8();
    let close = search_from + text[search_from..].find(BOLD)?;

    Some((
        &text[..open],
        &text[inner..close],
        &text[close + BOLD.len()..],
    ))
}

//! Low-level text scanning shared by the macro engine and its operators.

use std::ops::Range;

/// Two-character terminators are tried before single characters.
const TERMINATORS: [&str; 4] = ["\n\r", "\r\n", "\n", "\r"];

/// Length of the line terminator starting at `at`, or 0 if there is none.
pub fn terminator_len(source: &str, at: usize, end: usize) -> usize {
    let rest = &source[at..end];
    TERMINATORS
        .iter()
        .find(|t| rest.starts_with(*t))
        .map_or(0, |t| t.len())
}

/// Find the end of the line starting at or after `from`.
///
/// Returns the offset of the terminator and the offset just past it. When
/// no terminator occurs before `end`, both are `end`.
pub fn find_line_end(source: &str, from: usize, end: usize) -> (usize, usize) {
    match source[from..end].find(['\n', '\r']) {
        Some(rel) => {
            let at = from + rel;
            (at, at + terminator_len(source, at, end))
        }
        None => (end, end),
    }
}

pub fn contains_terminator(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// Advance a 0-based `(line, column)` over `text`.
///
/// Each terminator moves to the start of the next line; every other
/// character moves one column.
pub fn advance_position(text: &str, mut line: usize, mut column: usize) -> (usize, usize) {
    let mut at = 0;
    while at < text.len() {
        let terminator = terminator_len(text, at, text.len());
        if terminator > 0 {
            line += 1;
            column = 0;
            at += terminator;
        } else {
            let width = text[at..].chars().next().map_or(1, char::len_utf8);
            column += 1;
            at += width;
        }
    }
    (line, column)
}

/// Escape-aware search for a delimited span.
///
/// `text[from..]` must start with `open`. Scans forward, skipping any
/// escape sequence as a unit, until `close` is found. Returns the inner
/// span and the offset just past `close`, or `None` when `limit` is
/// reached first.
pub fn find_match(
    open: &str,
    close: &str,
    escapes: &[&str],
    text: &str,
    from: usize,
    limit: usize,
) -> Option<(Range<usize>, usize)> {
    if !text[from..limit].starts_with(open) {
        return None;
    }
    let start = from + open.len();
    let mut at = start;
    while at < limit {
        let rest = &text[at..limit];
        if let Some(escape) = escapes.iter().find(|e| rest.starts_with(*e)) {
            at += escape.len();
            continue;
        }
        if rest.starts_with(close) {
            return Some((start..at, at + close.len()));
        }
        at += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// The first line of `span`, shortened for error messages.
pub fn excerpt(source: &str, span: &Range<usize>) -> String {
    let start = span.start.min(source.len());
    let end = span.end.clamp(start, source.len());
    let text = &source[start..end];
    let first_line = text.lines().next().unwrap_or_default();
    let mut out: String = first_line.chars().take(80).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}


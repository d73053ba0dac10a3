//! Highlighting: turning match ranges into a sanitized, marked excerpt.
//!
//! The excerpt window is chosen on the raw haystack first, then every
//! segment is sanitized before the marker wraps it. Markup produced by the
//! marker is never touched by sanitization, and windowing can never cut
//! through a marker tag.

use crate::config::SearchConfig;
use crate::interface::HighlightRange;
use std::borrow::Cow;
use std::ops::Range;

/// Characters that could open or close markup in the rendered fragment.
const MARKUP_DELIMITERS: [char; 2] = ['<', '>'];

/// Remove markup delimiters from text.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if text.contains(MARKUP_DELIMITERS) {
        Cow::Owned(text.replace(MARKUP_DELIMITERS, ""))
    } else {
        Cow::Borrowed(text)
    }
}

/// Sanitize a segment and collapse whitespace runs into single spaces.
/// `prev_space` carries the collapse state across segment boundaries.
fn clean_segment(text: &str, prev_space: &mut bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKUP_DELIMITERS.contains(&ch) {
            continue;
        }
        if ch.is_whitespace() {
            if !*prev_space {
                out.push(' ');
            }
            *prev_space = true;
        } else {
            out.push(ch);
            *prev_space = false;
        }
    }
    out
}

/// Render `haystack` with every range passed through `mark(text, true)` and
/// the gaps between them through `mark(text, false)`.
///
/// `ranges` must be sorted by start; overlapping or out-of-bounds parts are
/// skipped. A segment that is empty after sanitizing is not marked.
pub fn highlight<F>(haystack: &str, ranges: &[HighlightRange], mut mark: F) -> String
where
    F: FnMut(&str, bool) -> String,
{
    let mut out = String::with_capacity(haystack.len() + ranges.len() * 48);
    let mut prev_space = false;
    let mut cursor = 0;

    let mut emit = |segment: &str, matched: bool, prev_space: &mut bool, out: &mut String| {
        let cleaned = clean_segment(segment, prev_space);
        if !cleaned.is_empty() {
            out.push_str(&mark(&cleaned, matched));
        }
    };

    for range in ranges {
        let start = range.start.max(cursor);
        let end = range.end.min(haystack.len());
        if start >= end {
            continue;
        }
        let (Some(gap), Some(hit)) = (haystack.get(cursor..start), haystack.get(start..end)) else {
            continue;
        };
        emit(gap, false, &mut prev_space, &mut out);
        emit(hit, true, &mut prev_space, &mut out);
        cursor = end;
    }
    if let Some(rest) = haystack.get(cursor..) {
        emit(rest, false, &mut prev_space, &mut out);
    }
    out
}

/// Marker wrapping matched text in `open`/`close` and passing the rest through.
pub fn marker<'a>(open: &'a str, close: &'a str) -> impl Fn(&str, bool) -> String + 'a {
    move |text, matched| {
        if matched {
            format!("{open}{text}{close}")
        } else {
            text.to_string()
        }
    }
}

/// Byte range of the excerpt shown for `ranges`.
///
/// The window covers the first match cluster (ranges starting within
/// `context_chars` characters of the first range) plus `context_chars`
/// characters on either side. A word cut by either edge is dropped; a word
/// containing matched text is kept whole instead.
pub fn context_window(haystack: &str, ranges: &[HighlightRange], context_chars: usize) -> Range<usize> {
    let Some(first) = ranges.first() else {
        return 0..haystack.len();
    };
    let first_start = first.start.min(haystack.len());
    let cluster_limit = forward_chars(haystack, first_start, context_chars);
    let cluster_end = ranges
        .iter()
        .take_while(|r| r.start <= cluster_limit)
        .map(|r| r.end)
        .max()
        .unwrap_or(first.end)
        .clamp(first_start, haystack.len());

    let mut start = back_chars(haystack, first_start, context_chars);
    let mut end = forward_chars(haystack, cluster_end, context_chars);

    if is_mid_word(haystack, start) {
        start = match haystack[start..first_start].find(char::is_whitespace) {
            Some(offset) => start + offset,
            // The truncated word runs into the match: keep it whole.
            None => word_start(haystack, start),
        };
    }
    start += leading_whitespace_len(&haystack[start..first_start]);

    if is_mid_word(haystack, end) {
        end = match haystack[cluster_end..end].rfind(char::is_whitespace) {
            Some(offset) => cluster_end + offset,
            None => word_end(haystack, end),
        };
    }
    end = cluster_end + haystack[cluster_end..end].trim_end().len();

    start..end
}

/// Marked, sanitized excerpt around the first match cluster.
pub fn highlight_excerpt(haystack: &str, ranges: &[HighlightRange], config: &SearchConfig) -> String {
    let window = context_window(haystack, ranges, config.context_chars);
    let local: Vec<HighlightRange> = ranges
        .iter()
        .filter_map(|r| {
            let start = r.start.max(window.start);
            let end = r.end.min(window.end);
            (start < end).then(|| HighlightRange {
                start: start - window.start,
                end: end - window.start,
                kind: r.kind,
            })
        })
        .collect();

    let mark = marker(&config.highlight_open, &config.highlight_close);
    highlight(&haystack[window], &local, mark).trim().to_string()
}

/// Description shown when there is nothing to highlight: sanitized and cut
/// to `max_chars` characters, with an ellipsis when something was cut.
pub fn description_preview(description: &str, max_chars: usize) -> Cow<'_, str> {
    match description.char_indices().nth(max_chars) {
        None => sanitize(description),
        Some((idx, _)) => {
            let kept = sanitize(&description[..idx]);
            Cow::Owned(format!("{}...", kept.trim_end()))
        }
    }
}

fn forward_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(i, _)| from + i)
}

fn back_chars(text: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map_or(0, |(i, _)| i)
}

/// Whether `idx` falls strictly inside a whitespace-delimited word.
fn is_mid_word(text: &str, idx: usize) -> bool {
    let before = text[..idx].chars().next_back();
    let at = text[idx..].chars().next();
    matches!((before, at), (Some(b), Some(a)) if !b.is_whitespace() && !a.is_whitespace())
}

fn word_start(text: &str, idx: usize) -> usize {
    text[..idx]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8())
}

fn word_end(text: &str, idx: usize) -> usize {
    text[idx..]
        .find(char::is_whitespace)
        .map_or(text.len(), |offset| idx + offset)
}

fn leading_whitespace_len(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

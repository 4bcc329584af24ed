//! Bounded, highlighted excerpts around a match.

use crate::search::fold::FoldedText;

const ELLIPSIS: &str = "...";
/// How far the window edge may move to land on whitespace.
const WORD_SNAP_CHARS: usize = 16;

/// Window sizes, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetWindow {
    pub before: usize,
    pub after: usize,
    pub max: usize,
}

impl Default for SnippetWindow {
    fn default() -> Self {
        Self {
            before: 100,
            after: 200,
            max: 300,
        }
    }
}

/// Single-line excerpt with byte ranges to highlight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub highlights: Vec<(usize, usize)>,
}

impl Snippet {
    /// Excerpt of `text` around byte `anchor`, highlighting every occurrence of `needles`.
    ///
    /// `needles` must already be lowercase.
    pub fn build(text: &str, anchor: usize, window: SnippetWindow, needles: &[String]) -> Self {
        let anchor = floor_boundary(text, anchor.min(text.len()));
        let before = window.before.min(window.max);
        let after = window.max.saturating_sub(before).min(window.after);

        let mut start = back_chars(text, anchor, before);
        let mut end = forward_chars(text, anchor, after);
        if start > 0 {
            start = snap_start(text, start, anchor);
        }
        if end < text.len() {
            end = snap_end(text, end, anchor);
        }

        let prefix = if start > 0 { ELLIPSIS } else { "" };
        let suffix = if end < text.len() { ELLIPSIS } else { "" };
        let body: String = text[start..end]
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();

        let folded = FoldedText::new(&body);
        let mut highlights: Vec<(usize, usize)> = needles
            .iter()
            .flat_map(|needle| folded.find_all(needle))
            .map(|(s, e)| (s + prefix.len(), e + prefix.len()))
            .collect();
        merge_ranges(&mut highlights);

        Self {
            text: format!("{prefix}{body}{suffix}"),
            highlights,
        }
    }
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn back_chars(text: &str, from: usize, count: usize) -> usize {
    text[..from]
        .char_indices()
        .rev()
        .take(count)
        .last()
        .map_or(from, |(idx, _)| idx)
}

fn forward_chars(text: &str, from: usize, count: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(idx, _)| from + idx)
}

/// Move a cut start forward past the next whitespace, if one is close and before the anchor.
fn snap_start(text: &str, start: usize, anchor: usize) -> usize {
    text[start..anchor]
        .char_indices()
        .take(WORD_SNAP_CHARS)
        .find(|(_, c)| c.is_whitespace())
        .map_or(start, |(idx, c)| start + idx + c.len_utf8())
}

/// Move a cut end back to the previous whitespace, if one is close and after the anchor.
fn snap_end(text: &str, end: usize, anchor: usize) -> usize {
    text[anchor..end]
        .char_indices()
        .rev()
        .take(WORD_SNAP_CHARS)
        .find(|(_, c)| c.is_whitespace())
        .map_or(end, |(idx, _)| anchor + idx)
}

fn merge_ranges(ranges: &mut Vec<(usize, usize)>) {
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for &(start, end) in ranges.iter() {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    *ranges = merged;
}

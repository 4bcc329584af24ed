//! Lowercased view of a string that remembers where each byte came from.
//!
//! Lowercasing can change byte lengths (`İ` becomes two chars), so positions found in
//! the folded text are mapped back through `origin` before slicing the original.

use memchr::memmem;

/// Lowercase `text` one char at a time, the same way [`FoldedText`] does.
///
/// Unlike `str::to_lowercase` this ignores final-sigma context, so a folded query always
/// lines up with folded block text.
pub fn fold(text: &str) -> String {
    if text.is_ascii() {
        return text.to_ascii_lowercase();
    }
    text.chars().flat_map(char::to_lowercase).collect()
}

#[derive(Debug, Clone)]
pub struct FoldedText<'a> {
    original: &'a str,
    folded: String,
    /// Byte offset in `original` of the char that produced each folded byte.
    /// `None` when the text is ASCII and offsets are unchanged.
    origin: Option<Vec<usize>>,
}

impl<'a> FoldedText<'a> {
    pub fn new(original: &'a str) -> Self {
        if original.is_ascii() {
            return Self {
                original,
                folded: original.to_ascii_lowercase(),
                origin: None,
            };
        }

        let mut folded = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());
        for (idx, ch) in original.char_indices() {
            for lower in ch.to_lowercase() {
                folded.push(lower);
                origin.extend(std::iter::repeat(idx).take(lower.len_utf8()));
            }
        }
        Self {
            original,
            folded,
            origin: Some(origin),
        }
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    /// First occurrence of an already-lowercased needle, as a range in the original.
    pub fn find(&self, needle: &str) -> Option<(usize, usize)> {
        if needle.is_empty() {
            return None;
        }
        memmem::find(self.folded.as_bytes(), needle.as_bytes())
            .map(|start| self.to_original(start, start + needle.len()))
    }

    /// First occurrence of a prebuilt, already-lowercased needle.
    pub fn find_with(&self, finder: &memmem::Finder<'_>) -> Option<(usize, usize)> {
        let len = finder.needle().len();
        if len == 0 {
            return None;
        }
        finder
            .find(self.folded.as_bytes())
            .map(|start| self.to_original(start, start + len))
    }

    /// Every non-overlapping occurrence, as ranges in the original.
    pub fn find_all(&self, needle: &str) -> Vec<(usize, usize)> {
        if needle.is_empty() {
            return Vec::new();
        }
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for start in memmem::find_iter(self.folded.as_bytes(), needle.as_bytes()) {
            let range = self.to_original(start, start + needle.len());
            if ranges.last().map_or(true, |last| range.0 >= last.1) {
                ranges.push(range);
            }
        }
        ranges
    }

    fn to_original(&self, start: usize, end: usize) -> (usize, usize) {
        let Some(origin) = &self.origin else {
            return (start, end);
        };
        let begin = origin[start];
        let last = origin[end - 1];
        let last_len = self.original[last..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        (begin, last + last_len)
    }
}

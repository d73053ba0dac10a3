//! Search candidate with memoized derived state.
//!
//! Module isolation ensures no code outside this module can mutate the
//! haystack after construction, so the `OnceLock` caches can never go stale.

use crate::normalize::{normalize, Haystack};
use crate::interface::Document;
use std::ops::Range;
use std::sync::OnceLock;

/// Case-folded view of a haystack that remembers where every folded char
/// came from, so matches found in folded text map back to byte ranges of the
/// original. Folding can change byte length ("İ" lowercases to two chars),
/// which rules out matching on `to_lowercase()` output directly.
#[derive(Debug, Clone)]
pub(crate) struct FoldedText {
    chars: Vec<char>,
    origins: Vec<Range<usize>>,
}

impl FoldedText {
    pub(crate) fn new(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut origins = Vec::with_capacity(text.len());
        for (idx, ch) in text.char_indices() {
            let origin = idx..idx + ch.len_utf8();
            for lower in ch.to_lowercase() {
                chars.push(lower);
                origins.push(origin.clone());
            }
        }
        Self { chars, origins }
    }

    /// Byte ranges (in the original text) of every non-overlapping occurrence
    /// of `needle`, which must already be lowercased.
    pub(crate) fn find_all(&self, needle: &[char]) -> Vec<Range<usize>> {
        let mut found = Vec::new();
        if needle.is_empty() || needle.len() > self.chars.len() {
            return found;
        }
        let mut i = 0;
        while i + needle.len() <= self.chars.len() {
            if self.chars[i..i + needle.len()] == *needle {
                let start = self.origins[i].start;
                let end = self.origins[i + needle.len() - 1].end;
                // A folded match can begin mid-way through an expanded char;
                // only keep it if it does not overlap the previous one.
                if found.last().map_or(true, |prev: &Range<usize>| prev.end <= start) {
                    found.push(start..end);
                }
                i += needle.len();
            } else {
                i += 1;
            }
        }
        found
    }
}

/// A document prepared for one search call.
/// `folded()` and `doc_words()` are computed on first access and cached,
/// so ranking and highlighting share the work.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub document_index: usize,
    haystack: Haystack,
    folded: OnceLock<FoldedText>,
    doc_words: OnceLock<Vec<(usize, usize, String)>>,
}

impl SearchCandidate {
    pub fn new(document_index: usize, haystack: Haystack) -> Self {
        Self {
            document_index,
            haystack,
            folded: OnceLock::new(),
            doc_words: OnceLock::new(),
        }
    }

    pub fn from_document(document_index: usize, doc: &Document) -> Self {
        Self::new(document_index, normalize(doc))
    }

    pub fn haystack(&self) -> &Haystack {
        &self.haystack
    }

    pub fn content(&self) -> &str {
        self.haystack.text()
    }

    pub(crate) fn folded(&self) -> &FoldedText {
        self.folded.get_or_init(|| FoldedText::new(self.haystack.text()))
    }

    /// Word and punctuation tokens as `(byte_start, byte_end, lowercased)`.
    /// Tokens inside inserted tag prefixes are left out.
    pub fn doc_words(&self) -> &[(usize, usize, String)] {
        self.doc_words.get_or_init(|| {
            let mut words = crate::search::tokenize_words(self.haystack.text());
            words.retain(|(start, end, _)| !self.haystack.overlaps_marker(&(*start..*end)));
            words
        })
    }

    /// Literal occurrences of the folded `needle`, minus any that touch an
    /// inserted tag prefix.
    pub(crate) fn literal_matches(&self, needle: &[char]) -> Vec<Range<usize>> {
        let mut found = self.folded().find_all(needle);
        found.retain(|r| !self.haystack.overlaps_marker(r));
        found
    }
}

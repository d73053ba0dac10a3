//! Bucket ranking for search results.
//!
//! Implements a lexicographic tuple where higher-priority signals always dominate
//! lower ones. 3/3 words ALWAYS beats 2/3, 0 typos ALWAYS beats 1 typo, and a
//! title hit beats a body hit when word-match quality is equal.

use crate::candidate::SearchCandidate;
use crate::config::{FieldWeights, FuzzyConfig};
use crate::search::is_word_token;
use serde::Serialize;

/// Bucket score tuple: derived Ord gives lexicographic comparison.
/// All components: higher = better.
///
/// Tuple order (most to least important):
/// 1. words_matched: count of query words found
/// 2. typo_score: 255 - total_edit_distance (fewer typos = higher)
/// 3. field_score: summed field weight of the best hit per query word, x1000
/// 4. exactness_score: 0-3 level
/// 5. proximity_score: u16::MAX - sum_of_pair_distances
/// 6. position_score: u32::MAX - byte offset of the first match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketScore {
    pub words_matched: u8,
    pub typo_score: u8,
    pub field_score: u16,
    pub exactness_score: u8,
    pub proximity_score: u16,
    pub position_score: u32,
}

impl BucketScore {
    /// Score for a document that contains the whole query literally.
    pub fn literal(word_count: usize, field_weight: f64, first_match: usize) -> Self {
        let words = word_count.max(1);
        BucketScore {
            words_matched: words.min(u8::MAX as usize) as u8,
            typo_score: 255,
            field_score: quantize_weight(field_weight * words as f64),
            exactness_score: 3,
            proximity_score: u16::MAX,
            position_score: position_score(first_match),
        }
    }
}

/// Per-query-word match result
#[derive(Debug, Clone)]
pub(crate) struct WordMatch {
    pub(crate) matched: bool,
    pub(crate) edit_dist: u8,
    pub(crate) doc_word_pos: usize,
    pub(crate) is_exact: bool,
    /// Whether this token counts toward the `words_matched` bucket score.
    /// Punctuation tokens (like "-", ".") don't; they participate in
    /// proximity and highlighting only.
    pub(crate) counts_as_match: bool,
    pub(crate) field_weight: f64,
    pub(crate) byte_start: usize,
}

impl WordMatch {
    fn unmatched(counts_as_match: bool) -> Self {
        WordMatch {
            matched: false,
            edit_dist: 0,
            doc_word_pos: 0,
            is_exact: false,
            counts_as_match,
            field_weight: 0.0,
            byte_start: 0,
        }
    }

    /// Lower is better: fewer edits first, then exact over prefix.
    fn quality(&self) -> (u8, bool) {
        (self.edit_dist, !self.is_exact)
    }
}

/// Compute the bucket score for a candidate document.
///
/// `query_words` must be lowercased. `literal` carries the field weight and
/// position of the first literal occurrence of the whole query, if any.
pub fn compute_bucket_score(
    candidate: &SearchCandidate,
    query_words: &[&str],
    last_word_is_prefix: bool,
    literal: Option<(f64, usize)>,
    fuzzy: &FuzzyConfig,
    weights: &FieldWeights,
) -> BucketScore {
    let word_matches = match_query_words(candidate, query_words, last_word_is_prefix, fuzzy, weights);

    let total_words = count_word_tokens(query_words);
    let mut words_matched = word_matches
        .iter()
        .filter(|m| m.matched && m.counts_as_match)
        .count();
    if literal.is_some() {
        // Literal containment means every query word occurs as a substring.
        words_matched = words_matched.max(total_words);
    }

    let total_edit_dist: u32 = word_matches
        .iter()
        .filter(|m| m.matched)
        .map(|m| m.edit_dist as u32)
        .sum();
    let typo_score = 255u32.saturating_sub(total_edit_dist) as u8;

    let word_field_sum: f64 = word_matches
        .iter()
        .filter(|m| m.matched)
        .map(|m| m.field_weight)
        .sum();
    let literal_field = literal.map_or(0.0, |(w, _)| w * total_words.max(1) as f64);

    let first_word_start = word_matches.iter().filter(|m| m.matched).map(|m| m.byte_start).min();
    let first_match = match (literal.map(|(_, pos)| pos), first_word_start) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    BucketScore {
        words_matched: words_matched.min(u8::MAX as usize) as u8,
        typo_score,
        field_score: quantize_weight(word_field_sum.max(literal_field)),
        exactness_score: compute_exactness(literal.is_some(), &word_matches),
        proximity_score: compute_proximity(&word_matches),
        position_score: first_match.map_or(0, position_score),
    }
}

/// Number of query tokens that are words (as opposed to punctuation runs).
pub(crate) fn count_word_tokens(query_words: &[&str]) -> usize {
    query_words.iter().filter(|w| is_word_token(w)).count()
}

fn quantize_weight(weight: f64) -> u16 {
    (weight * 1000.0).round().clamp(0.0, u16::MAX as f64) as u16
}

fn position_score(byte_offset: usize) -> u32 {
    u32::MAX.saturating_sub(byte_offset.min(u32::MAX as usize) as u32)
}

/// For each query word, find the best-matching document word: fewest edits,
/// then the heaviest field, then the earliest position.
pub(crate) fn match_query_words(
    candidate: &SearchCandidate,
    query_words: &[&str],
    last_word_is_prefix: bool,
    fuzzy: &FuzzyConfig,
    weights: &FieldWeights,
) -> Vec<WordMatch> {
    let doc_words = candidate.doc_words();
    let haystack = candidate.haystack();

    query_words
        .iter()
        .enumerate()
        .map(|(qi, qw)| {
            let is_last = qi == query_words.len() - 1;
            let allow_prefix = is_last && last_word_is_prefix;
            let counts_as_match = is_word_token(qw);

            let mut best: Option<WordMatch> = None;

            for (dpos, (start, _end, dw)) in doc_words.iter().enumerate() {
                let (edit_dist, is_exact) = match does_word_match(qw, dw, allow_prefix, fuzzy) {
                    WordMatchKind::Exact => (0, true),
                    WordMatchKind::Prefix => (0, false),
                    WordMatchKind::Fuzzy(dist) => (dist, false),
                    WordMatchKind::Subsequence(gaps) => (gaps.saturating_add(1), false),
                    WordMatchKind::None => continue,
                };
                let field_weight = haystack
                    .field_at(*start)
                    .map_or(0.0, |field| weights.weight(field));
                let candidate_match = WordMatch {
                    matched: true,
                    edit_dist,
                    doc_word_pos: dpos,
                    is_exact,
                    counts_as_match,
                    field_weight,
                    byte_start: *start,
                };
                let is_better = best.as_ref().map_or(true, |b| {
                    candidate_match.quality() < b.quality()
                        || (candidate_match.quality() == b.quality() && field_weight > b.field_weight)
                });
                if is_better {
                    best = Some(candidate_match);
                }
            }

            best.unwrap_or_else(|| WordMatch::unmatched(counts_as_match))
        })
        .collect()
}

/// Result of matching a query word against a document word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WordMatchKind {
    None,
    Exact,
    Prefix,
    Fuzzy(u8),
    Subsequence(u8),
}

/// Check if a query word matches a document word: exact -> prefix (if allowed)
/// -> fuzzy (edit distance) -> subsequence (abbreviation). Both inputs must
/// already be lowercased.
pub(crate) fn does_word_match(
    qw_lower: &str,
    dw_lower: &str,
    allow_prefix: bool,
    fuzzy: &FuzzyConfig,
) -> WordMatchKind {
    if dw_lower == qw_lower {
        return WordMatchKind::Exact;
    }
    let q_len = qw_lower.chars().count();
    if allow_prefix && q_len >= fuzzy.prefix_min_len && dw_lower.starts_with(qw_lower) {
        return WordMatchKind::Prefix;
    }
    let max_typo = fuzzy.max_edit_distance(q_len);
    if max_typo > 0 {
        if let Some(dist) = edit_distance_bounded(qw_lower, dw_lower, max_typo) {
            if dist > 0 {
                return WordMatchKind::Fuzzy(dist);
            }
        }
    }
    if let Some(gaps) = subsequence_match(qw_lower, dw_lower, fuzzy.subsequence_min_len) {
        return WordMatchKind::Subsequence(gaps);
    }
    WordMatchKind::None
}

/// Check if all characters in `query` appear in order in `target`.
/// Returns the number of gaps (non-contiguous segments - 1) if matched, None otherwise.
fn subsequence_match(query: &str, target: &str, min_len: usize) -> Option<u8> {
    let q_chars: Vec<char> = query.chars().collect();
    let t_chars: Vec<char> = target.chars().collect();

    if q_chars.len() < min_len.max(1) {
        return None;
    }
    // Must be shorter than target (equal/longer is exact territory)
    if q_chars.len() >= t_chars.len() {
        return None;
    }
    // Query must cover at least 50% of target length
    if q_chars.len() * 2 < t_chars.len() {
        return None;
    }
    // First character must match (abbreviations preserve the initial letter)
    if q_chars[0] != t_chars[0] {
        return None;
    }

    let mut qi = 0;
    let mut gaps = 0u8;
    let mut prev_matched = false;

    for &tc in &t_chars {
        if qi < q_chars.len() && tc == q_chars[qi] {
            if !prev_matched && qi > 0 {
                gaps = gaps.saturating_add(1);
            }
            qi += 1;
            prev_matched = true;
        } else {
            prev_matched = false;
        }
    }

    if qi == q_chars.len() {
        Some(gaps)
    } else {
        None
    }
}

/// Compute proximity score from matched word positions.
fn compute_proximity(word_matches: &[WordMatch]) -> u16 {
    let matched = word_matches.iter().filter(|m| m.matched).count();
    if matched < 2 {
        return u16::MAX;
    }

    let mut total_distance: u32 = 0;
    let mut prev_matched: Option<usize> = None;

    for wm in word_matches {
        if wm.matched {
            if let Some(prev_pos) = prev_matched {
                total_distance += wm.doc_word_pos.abs_diff(prev_pos) as u32;
            }
            prev_matched = Some(wm.doc_word_pos);
        }
    }

    u16::MAX.saturating_sub(total_distance.min(u16::MAX as u32) as u16)
}

/// Compute exactness score.
/// 3: Full query appears as literal substring (case-insensitive)
/// 2: All matched words are exact (0 edit distance each)
/// 1: Mix of exact and fuzzy matches
/// 0: All matches are fuzzy/prefix only
fn compute_exactness(has_literal: bool, word_matches: &[WordMatch]) -> u8 {
    if has_literal {
        return 3;
    }
    let mut matched = word_matches.iter().filter(|m| m.matched).peekable();
    if matched.peek().is_none() {
        return 0;
    }
    let (exact, total) = matched.fold((0usize, 0usize), |(e, t), m| (e + m.is_exact as usize, t + 1));
    if exact == total {
        2
    } else if exact > 0 {
        1
    } else {
        0
    }
}

/// Damerau-Levenshtein edit distance (optimal string alignment) with threshold pruning.
/// Counts insertions, deletions, substitutions, and adjacent transpositions each as 1 edit.
/// Returns `Some(distance)` if distance <= max_dist, `None` otherwise.
pub fn edit_distance_bounded(a: &str, b: &str, max_dist: u8) -> Option<u8> {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();
    let max_d = max_dist as usize;

    if m.abs_diff(n) > max_d {
        return None;
    }

    let mut prev2 = vec![0usize; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        let mut row_min = curr[0];

        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);

            if i >= 2
                && j >= 2
                && a_chars[i - 1] == b_chars[j - 2]
                && a_chars[i - 2] == b_chars[j - 1]
            {
                curr[j] = curr[j].min(prev2[j - 2] + 1);
            }

            row_min = row_min.min(curr[j]);
        }

        if row_min > max_d {
            return None;
        }

        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let result = prev[n];
    if result <= max_d {
        Some(result as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Document;

    fn fz() -> FuzzyConfig {
        FuzzyConfig::default()
    }

    fn candidate(doc: Document) -> SearchCandidate {
        SearchCandidate::from_document(0, &doc)
    }

    fn body_doc(body: &str) -> SearchCandidate {
        candidate(Document::new("d", "", "", "Note").with_body(body))
    }

    fn wm(pos: usize, dist: u8, exact: bool) -> WordMatch {
        WordMatch {
            matched: true,
            edit_dist: dist,
            doc_word_pos: pos,
            is_exact: exact,
            counts_as_match: true,
            field_weight: 0.2,
            byte_start: 0,
        }
    }

    // ── edit_distance_bounded tests ──────────────────────────────

    #[test]
    fn test_edit_distance_exact() {
        assert_eq!(edit_distance_bounded("hello", "hello", 2), Some(0));
    }

    #[test]
    fn test_edit_distance_one_deletion() {
        assert_eq!(edit_distance_bounded("tutrial", "tutorial", 1), Some(1));
    }

    #[test]
    fn test_edit_distance_one_substitution() {
        assert_eq!(edit_distance_bounded("hello", "hallo", 1), Some(1));
    }

    #[test]
    fn test_edit_distance_exceeds_threshold() {
        assert_eq!(edit_distance_bounded("hello", "world", 2), None);
    }

    #[test]
    fn test_edit_distance_length_prune() {
        assert_eq!(edit_distance_bounded("hi", "hello!", 2), None);
    }

    #[test]
    fn test_edit_distance_empty_strings() {
        assert_eq!(edit_distance_bounded("", "", 0), Some(0));
        assert_eq!(edit_distance_bounded("ab", "", 2), Some(2));
        assert_eq!(edit_distance_bounded("abc", "", 2), None);
    }

    #[test]
    fn test_edit_distance_transposition() {
        // Adjacent swap counts as 1 edit with Damerau-Levenshtein
        assert_eq!(edit_distance_bounded("xylohpone", "xylophone", 1), Some(1));
        assert_eq!(edit_distance_bounded("teh", "the", 1), Some(1));
        assert_eq!(edit_distance_bounded("recieve", "receive", 1), Some(1));
    }

    // ── subsequence_match tests ───────────────────────────────────

    #[test]
    fn test_subsequence_one_skip() {
        assert_eq!(subsequence_match("helo", "hello", 3), Some(1));
    }

    #[test]
    fn test_subsequence_contiguous() {
        assert_eq!(subsequence_match("hell", "hello", 3), Some(0));
    }

    #[test]
    fn test_subsequence_too_short() {
        assert_eq!(subsequence_match("ab", "abc", 3), None);
    }

    #[test]
    fn test_subsequence_low_coverage() {
        // 3 chars vs 7 = 43% < 50%
        assert_eq!(subsequence_match("abc", "abcdefg", 3), None);
    }

    #[test]
    fn test_subsequence_first_char_must_match() {
        assert_eq!(subsequence_match("est", "test", 3), None);
    }

    // ── does_word_match tests ────────────────────────────────────

    #[test]
    fn test_does_word_match_exact() {
        assert_eq!(does_word_match("test", "test", false, &fz()), WordMatchKind::Exact);
    }

    #[test]
    fn test_does_word_match_prefix() {
        assert_eq!(does_word_match("test", "testing", true, &fz()), WordMatchKind::Prefix);
        // Not allowed when allow_prefix=false
        assert_eq!(does_word_match("te", "testing", false, &fz()), WordMatchKind::None);
        // Single char prefix not allowed (< 2 chars)
        assert_eq!(does_word_match("t", "testing", true, &fz()), WordMatchKind::None);
    }

    #[test]
    fn test_does_word_match_fuzzy() {
        assert_eq!(does_word_match("tutrial", "tutorial", false, &fz()), WordMatchKind::Fuzzy(1));
        assert_eq!(does_word_match("xylohpone", "xylophone", false, &fz()), WordMatchKind::Fuzzy(1));
    }

    #[test]
    fn test_does_word_match_short_words_have_no_typo_budget() {
        // 4 chars → no edits allowed, and "tets" is not a subsequence of "test"
        assert_eq!(does_word_match("tets", "test", false, &fz()), WordMatchKind::None);
    }

    #[test]
    fn test_does_word_match_subsequence() {
        assert_eq!(does_word_match("helo", "hello", false, &fz()), WordMatchKind::Subsequence(1));
        assert_eq!(does_word_match("tstng", "testing", false, &fz()), WordMatchKind::Subsequence(2));
        assert_eq!(does_word_match("tng", "testing", false, &fz()), WordMatchKind::None);
    }

    #[test]
    fn test_does_word_match_respects_config() {
        let strict = FuzzyConfig { typo_one_min_len: 20, typo_two_min_len: 30, ..FuzzyConfig::default() };
        assert_eq!(does_word_match("tutrial", "tutorial", false, &strict), WordMatchKind::Subsequence(1));
        let no_abbrev = FuzzyConfig { subsequence_min_len: 10, ..strict };
        assert_eq!(does_word_match("tutrial", "tutorial", false, &no_abbrev), WordMatchKind::None);
    }

    // ── match_query_words tests ──────────────────────────────────

    #[test]
    fn test_match_prefers_title_over_body() {
        let c = candidate(
            Document::new("d", "Rust tips", "", "Note").with_body("more rust here"),
        );
        let matches = match_query_words(&c, &["rust"], false, &fz(), &FieldWeights::default());
        assert!(matches[0].matched);
        assert_eq!(matches[0].doc_word_pos, 0);
        assert!((matches[0].field_weight - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_match_prefers_exact_over_heavier_prefix() {
        let c = candidate(
            Document::new("d", "Testing guide", "", "Note").with_body("a test"),
        );
        let matches = match_query_words(&c, &["test"], true, &fz(), &FieldWeights::default());
        assert!(matches[0].is_exact);
        assert_eq!(matches[0].byte_start, 16);
    }

    #[test]
    fn test_match_prefix_not_allowed_non_last() {
        let c = body_doc("testing");
        let matches = match_query_words(&c, &["te", "hello"], true, &fz(), &FieldWeights::default());
        assert!(!matches[0].matched);
    }

    #[test]
    fn test_match_multi_word_positions() {
        let c = body_doc("hello beautiful world");
        let matches = match_query_words(&c, &["hello", "world"], false, &fz(), &FieldWeights::default());
        assert_eq!(matches[0].doc_word_pos, 0);
        assert_eq!(matches[1].doc_word_pos, 2);
    }

    // ── proximity / exactness tests ──────────────────────────────

    #[test]
    fn test_proximity_adjacent() {
        assert_eq!(compute_proximity(&[wm(0, 0, true), wm(1, 0, true)]), u16::MAX - 1);
    }

    #[test]
    fn test_proximity_single_word() {
        assert_eq!(compute_proximity(&[wm(3, 0, true)]), u16::MAX);
    }

    #[test]
    fn test_proximity_unmatched_words_skipped() {
        let gap = WordMatch::unmatched(true);
        assert_eq!(compute_proximity(&[wm(0, 0, true), gap, wm(3, 0, true)]), u16::MAX - 3);
    }

    #[test]
    fn test_exactness_levels() {
        assert_eq!(compute_exactness(true, &[]), 3);
        assert_eq!(compute_exactness(false, &[wm(0, 0, true), wm(2, 0, true)]), 2);
        assert_eq!(compute_exactness(false, &[wm(0, 0, true), wm(1, 1, false)]), 1);
        assert_eq!(compute_exactness(false, &[wm(0, 1, false)]), 0);
        assert_eq!(compute_exactness(false, &[WordMatch::unmatched(true)]), 0);
    }

    // ── bucket score ordering tests ──────────────────────────────

    #[test]
    fn test_words_matched_dominates() {
        let w = FieldWeights::default();
        let three = compute_bucket_score(&body_doc("hello beautiful world"), &["hello", "beautiful", "world"], false, None, &fz(), &w);
        let two = compute_bucket_score(
            &candidate(Document::new("d", "hello world", "", "Note")),
            &["hello", "beautiful", "world"], false, None, &fz(), &w,
        );
        assert!(three > two, "3 words matched should beat 2 words even from the body");
    }

    #[test]
    fn test_typo_dominates_field() {
        let w = FieldWeights::default();
        let exact_body = compute_bucket_score(&body_doc("tutorial"), &["tutorial"], false, None, &fz(), &w);
        let typo_title = compute_bucket_score(
            &candidate(Document::new("d", "tutorail", "", "Note")),
            &["tutorial"], false, None, &fz(), &w,
        );
        assert!(exact_body > typo_title, "Exact match should beat a typo even in a heavier field");
    }

    #[test]
    fn test_field_dominates_position() {
        let w = FieldWeights::default();
        let title = compute_bucket_score(
            &candidate(Document::new("d", "A long title about rust", "", "Note")),
            &["rust"], false, None, &fz(), &w,
        );
        let tag = compute_bucket_score(
            &candidate(Document::new("d", "", "", "Note").with_tags(["rust"])),
            &["rust"], false, None, &fz(), &w,
        );
        assert!(title > tag);
    }

    #[test]
    fn test_literal_counts_every_word() {
        let w = FieldWeights::default();
        let score = compute_bucket_score(&body_doc("latest posts"), &["est", "po"], false, Some((0.2, 3)), &fz(), &w);
        assert_eq!(score.words_matched, 2);
        assert_eq!(score.exactness_score, 3);
        assert_eq!(score.position_score, u32::MAX - 3);
    }

    #[test]
    fn test_literal_score_shape() {
        let s = BucketScore::literal(2, 0.3, 10);
        assert_eq!(s.words_matched, 2);
        assert_eq!(s.typo_score, 255);
        assert_eq!(s.field_score, 600);
        assert_eq!(s.exactness_score, 3);
        assert_eq!(s.position_score, u32::MAX - 10);
    }
}

//! Match engine (exact and fuzzy strategies with bucket ranking)
//!
//! Both strategies scan every candidate: the corpus is a few hundred posts at
//! most, so there is no index. Highlighting uses `does_word_match` from the
//! ranking module so what's highlighted matches what was ranked.

use crate::candidate::SearchCandidate;
use crate::config::{FieldWeights, FuzzyConfig, SearchConfig};
use crate::interface::{HighlightKind, HighlightRange, MatchResult, SearchMode};
use crate::ranking::{compute_bucket_score, count_word_tokens, does_word_match, BucketScore, WordMatchKind};
use std::ops::Range;

/// A parsed query. Matching is case-insensitive, so the query keeps a folded
/// copy alongside its word tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    folded: Vec<char>,
    words: Vec<String>,
    last_word_is_prefix: bool,
}

impl Query {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim().to_string();
        let folded = text.chars().flat_map(char::to_lowercase).collect();
        let words = tokenize_words(&text).into_iter().map(|(_, _, w)| w).collect();
        // "tes" is still being typed; "tes " is a finished word.
        let last_word_is_prefix =
            !raw.ends_with(char::is_whitespace) && text.ends_with(|c: char| c.is_alphanumeric());
        Self { text, folded, words, last_word_is_prefix }
    }

    /// The trimmed query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Lowercased word and punctuation tokens.
    pub fn words(&self) -> Vec<&str> {
        self.words.iter().map(String::as_str).collect()
    }

    pub fn last_word_is_prefix(&self) -> bool {
        self.last_word_is_prefix
    }
}

/// What a strategy found in one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMatch {
    pub ranges: Vec<HighlightRange>,
    pub score: BucketScore,
}

/// One way of deciding whether a candidate matches a query.
pub trait MatchStrategy: Send + Sync {
    fn mode(&self) -> SearchMode;

    /// `None` excludes the candidate from the results.
    fn find(&self, candidate: &SearchCandidate, query: &Query) -> Option<CandidateMatch>;
}

/// Literal, case-insensitive containment of the whole query.
#[derive(Debug, Clone, Default)]
pub struct ExactStrategy {
    weights: FieldWeights,
}

impl ExactStrategy {
    pub fn new(weights: FieldWeights) -> Self {
        Self { weights }
    }
}

impl MatchStrategy for ExactStrategy {
    fn mode(&self) -> SearchMode {
        SearchMode::Exact
    }

    fn find(&self, candidate: &SearchCandidate, query: &Query) -> Option<CandidateMatch> {
        let occurrences = candidate.literal_matches(&query.folded);
        let first = occurrences.first()?.start;
        let weight = best_field_weight(candidate, &occurrences, &self.weights);
        let word_count = count_word_tokens(&query.words());
        let ranges = occurrences
            .into_iter()
            .map(|r| HighlightRange { start: r.start, end: r.end, kind: HighlightKind::Exact })
            .collect();
        Some(CandidateMatch {
            ranges: merge_ranges(ranges),
            score: BucketScore::literal(word_count, weight, first),
        })
    }
}

/// Typo-tolerant word matching. A literal occurrence of the query always
/// qualifies, so every exact match is also a fuzzy match.
#[derive(Debug, Clone, Default)]
pub struct FuzzyStrategy {
    weights: FieldWeights,
    config: FuzzyConfig,
}

impl FuzzyStrategy {
    pub fn new(weights: FieldWeights, config: FuzzyConfig) -> Self {
        Self { weights, config }
    }
}

impl MatchStrategy for FuzzyStrategy {
    fn mode(&self) -> SearchMode {
        SearchMode::Fuzzy
    }

    fn find(&self, candidate: &SearchCandidate, query: &Query) -> Option<CandidateMatch> {
        let query_words = query.words();
        let literal = candidate.literal_matches(&query.folded);
        let literal_info = literal
            .first()
            .map(|first| (best_field_weight(candidate, &literal, &self.weights), first.start));

        let score = compute_bucket_score(
            candidate,
            &query_words,
            query.last_word_is_prefix,
            literal_info,
            &self.config,
            &self.weights,
        );

        if literal.is_empty() {
            let total = count_word_tokens(&query_words);
            if total == 0 {
                return None;
            }
            let coverage = score.words_matched as f64 / total as f64;
            if coverage < self.config.min_word_coverage {
                return None;
            }
        }

        let mut ranges = word_ranges(
            candidate.content(),
            candidate.doc_words(),
            &query_words,
            query.last_word_is_prefix,
            &self.config,
        );
        ranges.extend(
            literal
                .into_iter()
                .map(|r| HighlightRange { start: r.start, end: r.end, kind: HighlightKind::Exact }),
        );
        let ranges = merge_ranges(ranges);
        if ranges.is_empty() {
            return None;
        }
        Some(CandidateMatch { ranges, score })
    }
}

/// Both strategies, built once. Switching mode only picks the other one.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    exact: ExactStrategy,
    fuzzy: FuzzyStrategy,
}

impl MatchEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            exact: ExactStrategy::new(config.field_weights.clone()),
            fuzzy: FuzzyStrategy::new(config.field_weights.clone(), config.fuzzy.clone()),
        }
    }

    pub fn strategy(&self, mode: SearchMode) -> &dyn MatchStrategy {
        match mode {
            SearchMode::Exact => &self.exact,
            SearchMode::Fuzzy => &self.fuzzy,
        }
    }

    /// Match every candidate and return the hits best-first. Equal scores keep
    /// candidate order.
    pub fn run(&self, candidates: &[SearchCandidate], query: &Query, mode: SearchMode) -> Vec<MatchResult> {
        if query.is_empty() {
            return Vec::new();
        }
        let strategy = self.strategy(mode);
        let mut results: Vec<MatchResult> = candidates
            .iter()
            .filter_map(|candidate| {
                strategy.find(candidate, query).map(|m| MatchResult {
                    document_index: candidate.document_index,
                    ranges: m.ranges,
                    score: m.score,
                    rank: 0,
                })
            })
            .collect();

        // sort_by is stable
        results.sort_by(|a, b| b.score.cmp(&a.score));
        for (rank, result) in results.iter_mut().enumerate() {
            result.rank = rank;
        }

        tracing::trace!(
            mode = %mode,
            candidates = candidates.len(),
            matched = results.len(),
            "match engine pass"
        );
        results
    }
}

/// Heaviest field containing any of `occurrences`.
fn best_field_weight(candidate: &SearchCandidate, occurrences: &[Range<usize>], weights: &FieldWeights) -> f64 {
    let haystack = candidate.haystack();
    occurrences
        .iter()
        .filter_map(|r| haystack.field_at(r.start))
        .map(|field| weights.weight(field))
        .fold(0.0, f64::max)
}

/// Map a `WordMatchKind` from ranking to a `HighlightKind` for the UI.
fn word_match_to_highlight_kind(wmk: WordMatchKind) -> HighlightKind {
    match wmk {
        WordMatchKind::Exact => HighlightKind::Exact,
        WordMatchKind::Prefix => HighlightKind::Prefix,
        WordMatchKind::Fuzzy(_) => HighlightKind::Fuzzy,
        WordMatchKind::Subsequence(_) => HighlightKind::Subsequence,
        WordMatchKind::None => HighlightKind::Exact, // filtered out before conversion
    }
}

/// Ranges of every document word that matches some query word, using the
/// same criteria as ranking.
///
/// Adjacent ranges separated only by punctuation (or nothing) are bridged, so
/// "github" + "com" highlights "github.com" as one span.
pub(crate) fn word_ranges(
    content: &str,
    doc_words: &[(usize, usize, String)],
    query_words: &[&str],
    last_word_is_prefix: bool,
    fuzzy: &FuzzyConfig,
) -> Vec<HighlightRange> {
    let mut word_highlights: Vec<(usize, usize, HighlightKind)> = Vec::new();
    let last_qi = query_words.len().saturating_sub(1);

    for (start, end, doc_word) in doc_words {
        for (qi, qw) in query_words.iter().enumerate() {
            let allow_prefix = qi == last_qi && last_word_is_prefix;
            let wmk = does_word_match(qw, doc_word, allow_prefix, fuzzy);
            if wmk != WordMatchKind::None {
                word_highlights.push((*start, *end, word_match_to_highlight_kind(wmk)));
                break; // Don't double-highlight from multiple query words
            }
        }
    }

    word_highlights.sort_unstable_by_key(|&(s, _, _)| s);

    let mut bridged: Vec<(usize, usize, HighlightKind)> = Vec::with_capacity(word_highlights.len());
    for wh in &word_highlights {
        if let Some(last) = bridged.last_mut() {
            let gap_start = last.1;
            let gap_end = wh.0;
            if gap_start <= gap_end
                && content
                    .get(gap_start..gap_end)
                    .is_some_and(|gap| gap.chars().all(|c| !c.is_alphanumeric() && !c.is_whitespace()))
            {
                // Merge into previous range, inheriting its kind
                last.1 = wh.1;
                continue;
            }
        }
        bridged.push(*wh);
    }

    bridged
        .into_iter()
        .map(|(start, end, kind)| HighlightRange { start, end, kind })
        .collect()
}

/// Sort by start and fold overlapping or touching ranges together. The
/// earlier range's kind wins.
pub(crate) fn merge_ranges(mut ranges: Vec<HighlightRange>) -> Vec<HighlightRange> {
    ranges.retain(|r| !r.is_empty());
    ranges.sort_by_key(|r| (r.start, std::cmp::Reverse(r.end)));
    let mut merged: Vec<HighlightRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Tokenize text into tokens with byte offsets and lowercased text.
/// Produces both alphanumeric word tokens and non-whitespace punctuation tokens.
/// Whitespace is skipped (acts as a separator).
/// Punctuation tokens allow matching symbols like "://", ".", "-" in queries.
pub(crate) fn tokenize_words(content: &str) -> Vec<(usize, usize, String)> {
    let mut tokens = Vec::new();
    let mut chars = content.char_indices().peekable();
    while let Some(&(start, first)) = chars.peek() {
        if first.is_whitespace() {
            chars.next();
            continue;
        }
        let is_word = first.is_alphanumeric();
        let mut end = start;
        while let Some(&(idx, c)) = chars.peek() {
            let same_run = if is_word {
                c.is_alphanumeric()
            } else {
                !c.is_alphanumeric() && !c.is_whitespace()
            };
            if !same_run {
                break;
            }
            end = idx + c.len_utf8();
            chars.next();
        }
        tokens.push((start, end, content[start..end].to_lowercase()));
    }
    tokens
}

/// Whether a token from `tokenize_words` is an alphanumeric word (vs punctuation).
/// Tokens are homogeneous runs (either all alphanumeric or all punctuation)
/// so checking the first character is sufficient.
pub(crate) fn is_word_token(token: &str) -> bool {
    token.starts_with(|c: char| c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Document;

    fn candidates(docs: &[Document]) -> Vec<SearchCandidate> {
        docs.iter()
            .enumerate()
            .map(|(i, d)| SearchCandidate::from_document(i, d))
            .collect()
    }

    fn engine() -> MatchEngine {
        MatchEngine::new(&SearchConfig::default())
    }

    fn matched_ids(docs: &[Document], query: &str, mode: SearchMode) -> Vec<String> {
        engine()
            .run(&candidates(docs), &Query::parse(query), mode)
            .into_iter()
            .map(|m| docs[m.document_index].id.clone())
            .collect()
    }

    fn highlighted_words(content: &str, query_words: &[&str]) -> Vec<String> {
        let doc_words = tokenize_words(content);
        word_ranges(content, &doc_words, query_words, false, &FuzzyConfig::default())
            .iter()
            .map(|r| content[r.as_range()].to_string())
            .collect()
    }

    fn e2e_docs() -> Vec<Document> {
        vec![
            Document::new("one", "Test Post One", "", "Essay").with_tags(["testing", "e2e"]),
            Document::new("two", "Second Test Article", "", "Tutorial").with_tags(["tutorial"]),
        ]
    }

    // ── tokenizer / query ────────────────────────────────────────

    #[test]
    fn test_tokenize_words() {
        let words = tokenize_words("hello world");
        assert_eq!(words, vec![(0, 5, "hello".into()), (6, 11, "world".into())]);

        // Consecutive punctuation forms one token
        let words = tokenize_words("one--two...three");
        assert_eq!(words, vec![
            (0, 3, "one".into()),
            (3, 5, "--".into()),
            (5, 8, "two".into()),
            (8, 11, "...".into()),
            (11, 16, "three".into()),
        ]);

        // Tag prefix splits into its own tokens
        let words = tokenize_words("tag-Testing");
        assert_eq!(words, vec![
            (0, 3, "tag".into()),
            (3, 4, "-".into()),
            (4, 11, "testing".into()),
        ]);
    }

    #[test]
    fn test_tokenize_words_byte_offsets() {
        let text = "Café crème";
        let words = tokenize_words(text);
        assert_eq!(words.len(), 2);
        assert_eq!(&text[words[0].0..words[0].1], "Café");
        assert_eq!(words[1], (6, 12, "crème".into()));
    }

    #[test]
    fn test_query_parse() {
        let q = Query::parse("  Hello World");
        assert_eq!(q.text(), "Hello World");
        assert_eq!(q.words(), vec!["hello", "world"]);
        assert!(q.last_word_is_prefix());

        assert!(!Query::parse("hello ").last_word_is_prefix());
        assert!(!Query::parse("hello.").last_word_is_prefix());
        assert!(Query::parse("   ").is_empty());
    }

    // ── word highlighting ────────────────────────────────────────

    #[test]
    fn test_highlight_exact_match() {
        assert_eq!(highlighted_words("hello world", &["hello"]), vec!["hello"]);
    }

    #[test]
    fn test_highlight_typo_match() {
        assert_eq!(highlighted_words("Visit Riverside Park today", &["riversde"]), vec!["Riverside"]);
    }

    #[test]
    fn test_highlight_prefix_match() {
        let content = "Run testing suite now";
        let doc_words = tokenize_words(content);
        let ranges = word_ranges(content, &doc_words, &["tes"], true, &FuzzyConfig::default());
        let words: Vec<&str> = ranges.iter().map(|r| &content[r.as_range()]).collect();
        assert_eq!(words, vec!["testing"]);
        assert_eq!(ranges[0].kind, HighlightKind::Prefix);
    }

    #[test]
    fn test_highlight_no_match_short_word() {
        // "hx" is too short for subsequence (< 3 chars) and no fuzzy for short words
        assert!(highlighted_words("hello world", &["hx"]).is_empty());
    }

    #[test]
    fn test_highlight_multiple_occurrences() {
        assert_eq!(highlighted_words("hello world hello again", &["hello"]), vec!["hello", "hello"]);
    }

    #[test]
    fn test_highlight_does_not_bridge_whitespace_gaps() {
        assert_eq!(highlighted_words("hello beautiful world", &["hello", "world"]), vec!["hello", "world"]);
    }

    #[test]
    fn test_highlight_bridges_punctuation() {
        assert_eq!(highlighted_words("see https://github.com today", &["github", "com"]), vec!["github.com"]);
        let query = tokenize_words("http://github");
        let query_words: Vec<&str> = query.iter().map(|(_, _, w)| w.as_str()).collect();
        assert_eq!(query_words, vec!["http", "://", "github"]);
        assert_eq!(highlighted_words("https://github.com/user", &query_words), vec!["https://github"]);
    }

    // ── range merging ────────────────────────────────────────────

    #[test]
    fn test_merge_ranges_overlapping_and_sorted() {
        let hr = |start, end| HighlightRange { start, end, kind: HighlightKind::Exact };
        let merged = merge_ranges(vec![hr(10, 14), hr(0, 4), hr(2, 6), hr(12, 13), hr(5, 5)]);
        assert_eq!(merged, vec![hr(0, 6), hr(10, 14)]);
    }

    #[test]
    fn test_merge_ranges_joins_touching() {
        let hr = |start, end| HighlightRange { start, end, kind: HighlightKind::Exact };
        assert_eq!(merge_ranges(vec![hr(4, 6), hr(0, 2), hr(2, 4), hr(7, 9)]), vec![hr(0, 6), hr(7, 9)]);
    }

    #[test]
    fn test_back_to_back_occurrences_form_one_range() {
        let docs = vec![Document::new("a", "ÉÉÉ", "", "Note")];
        for mode in [SearchMode::Exact, SearchMode::Fuzzy] {
            let results = engine().run(&candidates(&docs), &Query::parse("é"), mode);
            assert_eq!(results.len(), 1, "{mode}");
            assert_eq!(results[0].ranges.iter().map(|r| r.as_range()).collect::<Vec<_>>(), vec![0..6], "{mode}");
        }
    }

    #[test]
    fn test_tag_prefix_is_not_searchable() {
        let docs = vec![
            Document::new("rust", "Rust notes", "", "Note").with_tags(["rust"]),
            Document::new("cooking", "Cooking", "", "Note").with_tags(["food"]),
            Document::new("soup", "HTML tag soup", "", "Note"),
        ];
        for mode in [SearchMode::Exact, SearchMode::Fuzzy] {
            assert_eq!(matched_ids(&docs, "tag", mode), vec!["soup"], "{mode}");
            assert!(matched_ids(&docs, "tag-food", mode).is_empty(), "{mode}");
            assert_eq!(matched_ids(&docs, "food", mode), vec!["cooking"], "{mode}");
        }
    }

    // ── strategies ───────────────────────────────────────────────

    #[test]
    fn test_exact_is_case_insensitive_substring() {
        let docs = vec![
            Document::new("a", "Debouncing Search Input", "", "Essay"),
            Document::new("b", "Searching things", "", "Note"),
            Document::new("c", "Unrelated", "", "Note"),
        ];
        assert_eq!(matched_ids(&docs, "SEARCH", SearchMode::Exact), vec!["a", "b"]);
        assert_eq!(matched_ids(&docs, "search input", SearchMode::Exact), vec!["a"]);
        assert!(matched_ids(&docs, "serach", SearchMode::Exact).is_empty());
    }

    #[test]
    fn test_exact_ranges_cover_every_occurrence() {
        let docs = vec![Document::new("a", "test", "another Test here", "Note")];
        let results = engine().run(&candidates(&docs), &Query::parse("test"), SearchMode::Exact);
        let content = SearchCandidate::from_document(0, &docs[0]).content().to_string();
        let words: Vec<&str> = results[0].ranges.iter().map(|r| &content[r.as_range()]).collect();
        assert_eq!(words, vec!["test", "Test"]);
    }

    #[test]
    fn test_fuzzy_tolerates_typos() {
        let docs = vec![Document::new("a", "Unique Search Terms Post", "", "Note").with_body("a xylophone solo")];
        assert_eq!(matched_ids(&docs, "xylohpone", SearchMode::Fuzzy), vec!["a"]);
        assert!(matched_ids(&docs, "xylohpone", SearchMode::Exact).is_empty());
    }

    #[test]
    fn test_fuzzy_requires_every_word_by_default() {
        let docs = vec![Document::new("a", "hello world", "", "Note")];
        assert!(matched_ids(&docs, "hello planet", SearchMode::Fuzzy).is_empty());

        let mut config = SearchConfig::default();
        config.fuzzy.min_word_coverage = 0.5;
        let lenient = MatchEngine::new(&config);
        let results = lenient.run(&candidates(&docs), &Query::parse("hello planet"), SearchMode::Fuzzy);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_fuzzy_matches_literal_fragments() {
        // Neither "est" nor "po" is a word match, but the literal text occurs
        let docs = vec![Document::new("a", "latest posts", "", "Note")];
        assert_eq!(matched_ids(&docs, "est po", SearchMode::Fuzzy), vec!["a"]);
        assert_eq!(matched_ids(&docs, "est po", SearchMode::Exact), vec!["a"]);
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let docs = vec![
            Document::new("a", "Regex (a+b)* explained", "", "Note"),
            Document::new("b", "ab ab ab", "", "Note"),
        ];
        assert_eq!(matched_ids(&docs, "(a+b)*", SearchMode::Exact), vec!["a"]);
        assert_eq!(matched_ids(&docs, "(a+b)*", SearchMode::Fuzzy), vec!["a"]);
        assert!(matched_ids(&docs, "[unclosed", SearchMode::Fuzzy).is_empty());
    }

    #[test]
    fn test_markup_query_is_literal() {
        let docs = vec![Document::new("a", "Escaping HTML", "", "Note").with_body("<script>alert(1)</script>")];
        assert_eq!(matched_ids(&docs, "<script>", SearchMode::Exact), vec!["a"]);
        assert_eq!(matched_ids(&docs, "<b>", SearchMode::Fuzzy), Vec::<String>::new());
    }

    #[test]
    fn test_title_match_ranks_first() {
        let docs = e2e_docs();
        assert_eq!(matched_ids(&docs, "test", SearchMode::Fuzzy), vec!["one", "two"]);
    }

    #[test]
    fn test_title_outranks_body() {
        let docs = vec![
            Document::new("body", "Notes", "", "Note").with_body("about rust"),
            Document::new("title", "Rust notes", "", "Note"),
        ];
        assert_eq!(matched_ids(&docs, "rust", SearchMode::Fuzzy), vec!["title", "body"]);
        assert_eq!(matched_ids(&docs, "rust", SearchMode::Exact), vec!["title", "body"]);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let docs = vec![
            Document::new("x", "same words", "", "Note"),
            Document::new("y", "same words", "", "Note"),
            Document::new("z", "same words", "", "Note"),
        ];
        assert_eq!(matched_ids(&docs, "same", SearchMode::Fuzzy), vec!["x", "y", "z"]);
        assert_eq!(matched_ids(&docs, "same", SearchMode::Exact), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_ranks_are_dense_and_ranges_sorted() {
        let docs = e2e_docs();
        let results = engine().run(&candidates(&docs), &Query::parse("test"), SearchMode::Fuzzy);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.rank, i);
            assert!(r.ranges.windows(2).all(|w| w[0].end <= w[1].start));
        }
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let docs = e2e_docs();
        assert!(matched_ids(&docs, "   ", SearchMode::Fuzzy).is_empty());
    }

    #[test]
    fn test_strategy_selection() {
        let e = engine();
        assert_eq!(e.strategy(SearchMode::Exact).mode(), SearchMode::Exact);
        assert_eq!(e.strategy(SearchMode::Fuzzy).mode(), SearchMode::Fuzzy);
    }
}

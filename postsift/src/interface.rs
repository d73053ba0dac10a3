//! postsift public interface
//!
//! Record types handed in by the content layer and handed back to the
//! presentation layer, plus the crate error type.

use crate::ranking::BucketScore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Which matching strategy a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Fuzzy,
    Exact,
}

impl SearchMode {
    pub fn toggled(self) -> Self {
        match self {
            SearchMode::Fuzzy => SearchMode::Exact,
            SearchMode::Exact => SearchMode::Fuzzy,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Fuzzy => f.write_str("Fuzzy"),
            SearchMode::Exact => f.write_str("Exact"),
        }
    }
}

/// The type of match that produced a highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Exact,
    Prefix,
    Fuzzy,
    Subsequence,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A blog post as supplied by the content collection. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(alias = "slug")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Rendered post body. Collections that only ship front matter leave this empty.
    #[serde(default, alias = "content")]
    pub body: Option<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            description: description.into(),
            tags: Vec::new(),
            category: category.into(),
            date: None,
            body: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// A highlight range `[start, end)` in haystack byte offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

impl HighlightRange {
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One matched document, as produced by the match engine.
///
/// `ranges` are sorted by start and never overlap. `rank` is the 0-based
/// position in the best-first ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub document_index: usize,
    pub ranges: Vec<HighlightRange>,
    pub score: BucketScore,
    pub rank: usize,
}

/// A document ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedResult {
    #[serde(flatten)]
    pub document: Document,
    /// Sanitized HTML excerpt with marked matches. `None` when no search ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_results: Option<String>,
}

impl RenderedResult {
    pub fn plain(document: Document) -> Self {
        Self { document, highlighted_results: None }
    }

    /// Text to show under the title: the excerpt if there is one, otherwise
    /// the description truncated to `preview_chars`.
    pub fn display_text(&self, preview_chars: usize) -> Cow<'_, str> {
        match &self.highlighted_results {
            Some(html) => Cow::Borrowed(html.as_str()),
            None => crate::highlight::description_preview(&self.document.description, preview_chars),
        }
    }
}

/// Search result container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub mode: SearchMode,
    pub results: Vec<RenderedResult>,
    /// The engine failed and `results` is the unranked category-filtered set.
    pub degraded: bool,
}

impl SearchResult {
    /// A non-empty query that matched nothing. Lets the presentation layer
    /// show its "no posts found" affordance instead of the unsearched list.
    pub fn is_no_results(&self) -> bool {
        !self.query.trim().is_empty() && self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.document.title.as_str()).collect()
    }
}

/// Error type for postsift operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Match engine failure: {0}")]
    EngineFailure(String),
    #[error("Operation cancelled")]
    Cancelled,
}

/// Parse a JSON array of documents as exported by the content collection.
pub fn documents_from_json(json: &str) -> Result<Vec<Document>, SearchError> {
    Ok(serde_json::from_str(json)?)
}

impl From<&demo_posts::DemoPost> for Document {
    fn from(post: &demo_posts::DemoPost) -> Self {
        let mut doc = Document::new(post.slug, post.title, post.description, post.category)
            .with_tags(post.tags.iter().copied())
            .with_body(post.body);
        if let Some(subtitle) = post.subtitle {
            doc = doc.with_subtitle(subtitle);
        }
        if let Ok(date) = NaiveDate::parse_from_str(post.date, "%Y-%m-%d") {
            doc = doc.with_date(date);
        }
        doc
    }
}

/// The bundled demo posts as documents.
pub fn demo_documents() -> Vec<Document> {
    demo_posts::DEMO_POSTS.iter().map(Document::from).collect()
}

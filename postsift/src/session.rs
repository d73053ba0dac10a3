//! SearchSession - the two entry points the presentation layer calls.
//!
//! Concurrency model:
//! - Matching is synchronous and pure over the documents passed in; nothing
//!   is indexed or cached between calls
//! - The mode lives behind a `parking_lot::RwLock` and is read once at the
//!   start of a call, so a toggle never changes a search already in flight
//! - `perform_search` runs the work on tokio's blocking pool, falling back to a
//!   process-wide runtime when called outside any runtime
//!
//! Async cancellation: dropping the `perform_search` future drops a DropGuard
//! that cancels a CancellationToken. The blocking thread checks the token
//! before rendering and stops early.

use crate::candidate::SearchCandidate;
use crate::config::SearchConfig;
use crate::filter::filter_by_category;
use crate::highlight::{description_preview, highlight_excerpt};
use crate::interface::{Document, RenderedResult, SearchError, SearchMode, SearchResult};
use crate::search::{MatchEngine, Query};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Global fallback Tokio runtime for when async functions are called outside any runtime context.
/// Shared across all sessions and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// RAII guard that cancels a token when dropped.
pub(crate) struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
pub(crate) fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// Search state for one reader: the active mode plus an engine built once
/// from the configuration.
#[derive(Debug)]
pub struct SearchSession {
    engine: Arc<MatchEngine>,
    config: Arc<SearchConfig>,
    mode: RwLock<SearchMode>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    /// Session with the default configuration, in fuzzy mode.
    pub fn new() -> Self {
        Self::build(SearchConfig::default())
    }

    pub fn with_config(config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SearchConfig) -> Self {
        Self {
            engine: Arc::new(MatchEngine::new(&config)),
            config: Arc::new(config),
            mode: RwLock::new(SearchMode::default()),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn mode(&self) -> SearchMode {
        *self.mode.read()
    }

    /// Flip between fuzzy and exact. Returns the new mode.
    pub fn toggle_mode(&self) -> SearchMode {
        let mut mode = self.mode.write();
        *mode = mode.toggled();
        debug!(mode = %*mode, "search mode toggled");
        *mode
    }

    pub fn set_mode(&self, mode: SearchMode) {
        *self.mode.write() = mode;
    }

    /// Run a search on the calling thread.
    pub fn search_blocking<S: AsRef<str>>(&self, documents: &[Document], categories: &[S], query: &str) -> SearchResult {
        let mode = self.mode();
        let token = CancellationToken::new();
        execute(&self.engine, &self.config, documents, categories, query, mode, &token)
            .unwrap_or_else(|_| fallback(documents, categories, query, mode))
    }

    /// Filter, match, rank and highlight `documents`.
    ///
    /// An empty query returns the category-filtered documents unranked and
    /// without highlights. Never fails: if the engine breaks, the
    /// category-filtered set comes back with `degraded` set.
    pub async fn perform_search(&self, documents: Arc<[Document]>, categories: Vec<String>, query: String) -> SearchResult {
        let mode = self.mode();

        let token = CancellationToken::new();
        let _guard = DropGuard::new(token.clone());

        let engine = Arc::clone(&self.engine);
        let config = Arc::clone(&self.config);
        let docs = Arc::clone(&documents);
        let cats = categories.clone();
        let query_owned = query.clone();
        let token_clone = token.clone();

        // runtime.spawn_blocking rather than tokio::task::spawn_blocking so
        // callers without a runtime still work
        let handle = runtime_handle().spawn_blocking(move || {
            execute(&engine, &config, &docs, &cats, &query_owned, mode, &token_clone)
        });

        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "search did not complete");
                fallback(&documents, &categories, &query, mode)
            }
            Err(join_error) => {
                // JoinError means the task panicked or was aborted
                error!(error = %join_error, "search task failed");
                fallback(&documents, &categories, &query, mode)
            }
        }
    }
}

fn execute<S: AsRef<str>>(
    engine: &MatchEngine,
    config: &SearchConfig,
    documents: &[Document],
    categories: &[S],
    query: &str,
    mode: SearchMode,
    token: &CancellationToken,
) -> Result<SearchResult, SearchError> {
    let started = Instant::now();
    let filtered = filter_by_category(documents, categories);
    let parsed = Query::parse(query);

    if parsed.is_empty() {
        return Ok(SearchResult {
            query: query.to_string(),
            mode,
            results: filtered.into_iter().cloned().map(RenderedResult::plain).collect(),
            degraded: false,
        });
    }

    if token.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let result = run_guarded(query, mode, &filtered, || {
        let candidates: Vec<SearchCandidate> = filtered
            .iter()
            .enumerate()
            .map(|(i, doc)| SearchCandidate::from_document(i, doc))
            .collect();
        let matches = engine.run(&candidates, &parsed, mode);
        if token.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        Ok(matches
            .into_iter()
            .map(|m| {
                let doc = filtered[m.document_index];
                let excerpt = highlight_excerpt(candidates[m.document_index].content(), &m.ranges, config);
                let highlighted = if excerpt.is_empty() {
                    description_preview(&doc.description, config.preview_chars).into_owned()
                } else {
                    excerpt
                };
                RenderedResult { document: doc.clone(), highlighted_results: Some(highlighted) }
            })
            .collect())
    })?;

    debug!(
        query = %parsed.text(),
        mode = %mode,
        filtered = filtered.len(),
        matched = result.results.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "search complete"
    );
    Ok(result)
}

/// Run the match-and-render step, turning a panic into the degraded result.
fn run_guarded<F>(query: &str, mode: SearchMode, filtered: &[&Document], work: F) -> Result<SearchResult, SearchError>
where
    F: FnOnce() -> Result<Vec<RenderedResult>, SearchError>,
{
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(results) => Ok(SearchResult {
            query: query.to_string(),
            mode,
            results: results?,
            degraded: false,
        }),
        Err(panic) => {
            let failure = SearchError::EngineFailure(panic_message(panic.as_ref()));
            error!(error = %failure, query, mode = %mode, "falling back to unranked results");
            Ok(SearchResult {
                query: query.to_string(),
                mode,
                results: filtered.iter().map(|doc| RenderedResult::plain((*doc).clone())).collect(),
                degraded: true,
            })
        }
    }
}

fn fallback<S: AsRef<str>>(documents: &[Document], categories: &[S], query: &str, mode: SearchMode) -> SearchResult {
    SearchResult {
        query: query.to_string(),
        mode,
        results: filter_by_category(documents, categories)
            .into_iter()
            .cloned()
            .map(RenderedResult::plain)
            .collect(),
        degraded: true,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

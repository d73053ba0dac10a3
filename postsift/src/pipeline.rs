//! Debounced query pipeline.
//!
//! Rapid input is coalesced: the first submission of a burst runs at once
//! (leading edge), later ones keep pushing a single timer back, and when
//! input pauses the final request runs (trailing edge). Every submission gets
//! a generation number and only a result newer than the last published one
//! is applied, so a slow early search can never overwrite a later one.

use crate::config::SearchConfig;
use crate::interface::{Document, SearchResult};
use crate::scheduler::Scheduler;
use crate::session::SearchSession;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Everything one search depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub documents: Arc<[Document]>,
    pub categories: Vec<String>,
    pub query: String,
}

impl SearchRequest {
    pub fn new(documents: Arc<[Document]>, categories: Vec<String>, query: impl Into<String>) -> Self {
        Self { documents, categories, query: query.into() }
    }
}

/// Runs one search synchronously.
pub trait SearchExecutor: Send + Sync + 'static {
    fn execute(&self, request: &SearchRequest) -> SearchResult;
}

impl SearchExecutor for SearchSession {
    fn execute(&self, request: &SearchRequest) -> SearchResult {
        self.search_blocking(&request.documents, &request.categories, &request.query)
    }
}

/// What the consumer currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Nothing has completed yet.
    #[default]
    NotSearched,
    Completed { generation: u64, result: SearchResult },
}

impl PipelineState {
    pub fn generation(&self) -> u64 {
        match self {
            PipelineState::NotSearched => 0,
            PipelineState::Completed { generation, .. } => *generation,
        }
    }

    pub fn result(&self) -> Option<&SearchResult> {
        match self {
            PipelineState::NotSearched => None,
            PipelineState::Completed { result, .. } => Some(result),
        }
    }
}

// ─── Debouncer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    Idle,
    Pending,
    Running,
}

enum DebounceState<H> {
    Idle,
    Pending { handle: H, generation: u64 },
    Running { generation: u64 },
}

type RunFn<T> = Box<dyn Fn(u64, T) + Send + Sync>;

struct DebounceInner<S: Scheduler, T> {
    scheduler: S,
    delay: Duration,
    state: Mutex<DebounceState<S::Handle>>,
    generation: AtomicU64,
    token: CancellationToken,
    run: RunFn<T>,
}

impl<S: Scheduler, T> DebounceInner<S, T> {
    fn execute(&self, generation: u64, payload: T) {
        if !self.token.is_cancelled() {
            (self.run)(generation, payload);
        }
    }

    /// Trailing edge. Skipped if a newer submission replaced this timer.
    fn fire(&self, generation: u64, payload: T) {
        {
            let mut state = self.state.lock();
            let current = matches!(&*state, DebounceState::Pending { generation: g, .. } if *g == generation);
            if !current {
                return;
            }
            *state = DebounceState::Running { generation };
        }
        self.execute(generation, payload);
        let mut state = self.state.lock();
        if matches!(&*state, DebounceState::Running { generation: g } if *g == generation) {
            *state = DebounceState::Idle;
        }
    }
}

/// Leading + trailing edge debounce over a [`Scheduler`].
///
/// Dropping the debouncer cancels the pending timer and the token, so no
/// callback fires after teardown.
pub struct Debouncer<S: Scheduler + 'static, T: Clone + Send + 'static> {
    inner: Arc<DebounceInner<S, T>>,
}

impl<S: Scheduler + 'static, T: Clone + Send + 'static> Debouncer<S, T> {
    pub fn new<F>(scheduler: S, delay: Duration, token: CancellationToken, run: F) -> Self
    where
        F: Fn(u64, T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(DebounceInner {
                scheduler,
                delay,
                state: Mutex::new(DebounceState::Idle),
                generation: AtomicU64::new(0),
                token,
                run: Box::new(run),
            }),
        }
    }

    /// Submit a payload and return its generation. Submissions after
    /// shutdown are ignored.
    pub fn submit(&self, payload: T) -> u64 {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.inner.token.is_cancelled() {
            return generation;
        }

        let leading = {
            let mut state = self.inner.state.lock();
            let leading = match std::mem::replace(&mut *state, DebounceState::Idle) {
                DebounceState::Pending { handle, .. } => {
                    self.inner.scheduler.cancel(handle);
                    false
                }
                DebounceState::Idle | DebounceState::Running { .. } => true,
            };

            // Tasks hold a Weak so a dropped debouncer is never kept alive by its own timer.
            let weak = Arc::downgrade(&self.inner);
            let trailing_payload = payload.clone();
            let handle = self.inner.scheduler.schedule(
                self.inner.delay,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire(generation, trailing_payload);
                    }
                }),
            );
            *state = DebounceState::Pending { handle, generation };
            leading
        };

        if leading {
            let weak: Weak<DebounceInner<S, T>> = Arc::downgrade(&self.inner);
            self.inner.scheduler.run_now(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.execute(generation, payload);
                }
            }));
        }
        generation
    }

    pub fn phase(&self) -> DebouncePhase {
        match &*self.inner.state.lock() {
            DebounceState::Idle => DebouncePhase::Idle,
            DebounceState::Pending { .. } => DebouncePhase::Pending,
            DebounceState::Running { .. } => DebouncePhase::Running,
        }
    }

    /// Cancel the pending timer and stop running anything further.
    pub fn shutdown(&self) {
        self.inner.token.cancel();
        let previous = std::mem::replace(&mut *self.inner.state.lock(), DebounceState::Idle);
        if let DebounceState::Pending { handle, .. } = previous {
            self.inner.scheduler.cancel(handle);
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.token.is_cancelled()
    }
}

impl<S: Scheduler + 'static, T: Clone + Send + 'static> Drop for Debouncer<S, T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─── SearchPipeline ──────────────────────────────────────────────────────────

/// Debounced searches publishing into a `watch` channel.
pub struct SearchPipeline<S: Scheduler + 'static> {
    debouncer: Debouncer<S, SearchRequest>,
    state_tx: Arc<watch::Sender<PipelineState>>,
    last_request: Mutex<Option<SearchRequest>>,
}

impl<S: Scheduler + 'static> SearchPipeline<S> {
    pub fn new(executor: Arc<dyn SearchExecutor>, scheduler: S, delay: Duration) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::NotSearched);
        let state_tx = Arc::new(state_tx);
        let token = CancellationToken::new();

        let tx = Arc::clone(&state_tx);
        let run_token = token.clone();
        let debouncer = Debouncer::new(scheduler, delay, token, move |generation, request: SearchRequest| {
            let result = executor.execute(&request);
            // A search that finished after teardown has nobody to report to.
            if !run_token.is_cancelled() {
                publish(&tx, generation, result);
            }
        });

        Self { debouncer, state_tx, last_request: Mutex::new(None) }
    }

    /// Pipeline waiting `config.debounce_ms` for the trailing edge.
    pub fn from_config(executor: Arc<dyn SearchExecutor>, scheduler: S, config: &SearchConfig) -> Self {
        Self::new(executor, scheduler, config.debounce())
    }

    /// Queue a search and return its generation.
    pub fn submit(&self, request: SearchRequest) -> u64 {
        tracing::trace!(query = %request.query, categories = request.categories.len(), "search submitted");
        *self.last_request.lock() = Some(request.clone());
        self.debouncer.submit(request)
    }

    /// Reset the query and category selection, keeping the same documents.
    /// Returns `None` when nothing has been submitted yet.
    pub fn clear(&self) -> Option<u64> {
        let documents = self.last_request.lock().as_ref().map(|r| Arc::clone(&r.documents))?;
        Some(self.submit(SearchRequest::new(documents, Vec::new(), String::new())))
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state_tx.borrow().clone()
    }

    pub fn phase(&self) -> DebouncePhase {
        self.debouncer.phase()
    }

    pub fn shutdown(&self) {
        self.debouncer.shutdown();
    }
}

/// Apply `result` only if it is newer than what is already published.
fn publish(tx: &watch::Sender<PipelineState>, generation: u64, result: SearchResult) -> bool {
    tx.send_if_modified(|state| {
        if generation > state.generation() {
            *state = PipelineState::Completed { generation, result };
            true
        } else {
            tracing::debug!(generation, current = state.generation(), "discarding superseded search result");
            false
        }
    })
}

//! postsift - search and highlighting for a small collection of blog posts
//!
//! Posts are filtered by category, matched against a free-text query with an
//! exact or a typo-tolerant strategy, ranked, and rendered as sanitized
//! excerpts with the matches marked. There is no index: every call re-scans
//! the posts it is given.

pub mod candidate;
pub mod config;
pub mod filter;
pub mod highlight;
pub mod interface;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod scheduler;
pub mod search;
mod session;

pub use candidate::SearchCandidate;
pub use config::{FieldWeights, FuzzyConfig, SearchConfig};
pub use filter::{filter_by_category, known_categories};
pub use interface::*;
pub use normalize::{normalize, Field, Haystack};
pub use pipeline::{DebouncePhase, Debouncer, PipelineState, SearchExecutor, SearchPipeline, SearchRequest};
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use search::{MatchEngine, MatchStrategy, Query};
pub use session::SearchSession;

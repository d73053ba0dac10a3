//! Tunable search parameters.
//!
//! Defaults reproduce the blog's shipped behavior. Every field can be
//! overridden from a JSON file; missing keys keep their default.

use crate::interface::SearchError;
use crate::normalize::Field;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relative weight of each document field in ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldWeights {
    pub title: f64,
    pub subtitle: f64,
    pub tags: f64,
    pub body: f64,
    pub description: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 0.3,
            subtitle: 0.2,
            tags: 0.1,
            body: 0.2,
            description: 0.2,
        }
    }
}

impl FieldWeights {
    pub fn weight(&self, field: Field) -> f64 {
        match field {
            Field::Title => self.title,
            Field::Subtitle => self.subtitle,
            Field::Tags => self.tags,
            Field::Body => self.body,
            Field::Description => self.description,
        }
    }
}

/// Tolerance of the fuzzy strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FuzzyConfig {
    /// Fraction of query words that must match for a document to qualify.
    pub min_word_coverage: f64,
    /// Shortest query word allowed to match as a prefix.
    pub prefix_min_len: usize,
    /// Shortest query word allowed to match as an abbreviation.
    pub subsequence_min_len: usize,
    /// Query words at least this long tolerate one edit.
    pub typo_one_min_len: usize,
    /// Query words at least this long tolerate two edits.
    pub typo_two_min_len: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            min_word_coverage: 1.0,
            prefix_min_len: 2,
            subsequence_min_len: 3,
            typo_one_min_len: 5,
            typo_two_min_len: 9,
        }
    }
}

impl FuzzyConfig {
    /// Maximum allowed edit distance for a query word of `word_len` chars.
    pub fn max_edit_distance(&self, word_len: usize) -> u8 {
        if word_len < self.typo_one_min_len {
            0
        } else if word_len < self.typo_two_min_len {
            1
        } else {
            2
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    pub field_weights: FieldWeights,
    pub fuzzy: FuzzyConfig,
    /// Characters of context kept on each side of the first match cluster.
    pub context_chars: usize,
    /// Length of the description shown when there is nothing to highlight.
    pub preview_chars: usize,
    /// Quiet period before the trailing search of a burst runs.
    pub debounce_ms: u64,
    pub highlight_open: String,
    pub highlight_close: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            field_weights: FieldWeights::default(),
            fuzzy: FuzzyConfig::default(),
            context_chars: 200,
            preview_chars: 200,
            debounce_ms: 100,
            highlight_open: r#"<b style="color:var(--brand-accent)">"#.to_string(),
            highlight_close: "</b>".to_string(),
        }
    }
}

impl SearchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SearchError> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        let w = &self.field_weights;
        for (name, value) in [
            ("title", w.title),
            ("subtitle", w.subtitle),
            ("tags", w.tags),
            ("body", w.body),
            ("description", w.description),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SearchError::InvalidConfig(format!(
                    "field weight `{name}` must be a non-negative number, got {value}"
                )));
            }
        }
        let coverage = self.fuzzy.min_word_coverage;
        if !(coverage > 0.0 && coverage <= 1.0) {
            return Err(SearchError::InvalidConfig(format!(
                "minWordCoverage must be in (0, 1], got {coverage}"
            )));
        }
        if self.fuzzy.typo_two_min_len < self.fuzzy.typo_one_min_len {
            return Err(SearchError::InvalidConfig(
                "typoTwoMinLen must not be smaller than typoOneMinLen".to_string(),
            ));
        }
        Ok(())
    }
}

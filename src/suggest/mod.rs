//! Autocomplete suggestions merged from the requesting user's search
//! history, globally popular queries, and indexed content (titles,
//! categories, tags).
//!
//! Sources merge in fixed priority order and duplicates are removed by
//! normalized text, so a term surfaced by a higher-priority source never
//! reappears under a lower one. Only visible entries contribute content
//! candidates.

use crate::analytics::AnalyticsEngine;
use crate::config::SuggestConfig;
use crate::models::{Suggestion, SuggestionSource};
use crate::store::IndexStore;
use crate::text::normalize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

pub struct SuggestionService {
    store: Arc<IndexStore>,
    analytics: Arc<AnalyticsEngine>,
    config: SuggestConfig,
}

impl SuggestionService {
    pub fn new(
        store: Arc<IndexStore>,
        analytics: Arc<AnalyticsEngine>,
        config: SuggestConfig,
    ) -> Self {
        Self {
            store,
            analytics,
            config,
        }
    }

    /// Suggest completions for a partial query. An empty partial falls back
    /// to trending queries so type-ahead has something to show immediately.
    pub fn suggest(&self, partial: &str, user_id: Option<u64>, limit: Option<usize>) -> Vec<Suggestion> {
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit)
            .max(1);
        let prefix = normalize(partial);

        let mut merged = Merge::new(limit);

        if prefix.is_empty() {
            for entry in self.analytics.popular_queries() {
                merged.push(entry.query, SuggestionSource::Popular);
            }
            return merged.finish();
        }

        // History and popular match anywhere in the query text, not just
        // at the start
        if let Some(uid) = user_id {
            for query in self.analytics.user_history(uid) {
                if query.contains(&prefix) {
                    merged.push(query, SuggestionSource::History);
                }
            }
        }

        for entry in self.analytics.popular_queries() {
            if normalize(&entry.query).contains(&prefix) {
                merged.push(entry.query, SuggestionSource::Popular);
            }
        }

        let visible = self.store.visible_snapshot();

        // Prefix matches outrank substring matches; each group alphabetical
        let mut prefixed: Vec<&str> = Vec::new();
        let mut contained: Vec<&str> = Vec::new();
        for entry in &visible {
            let normalized = normalize(&entry.title);
            if normalized.starts_with(&prefix) {
                prefixed.push(entry.title.as_str());
            } else if normalized.contains(&prefix) {
                contained.push(entry.title.as_str());
            }
        }
        prefixed.sort_unstable();
        contained.sort_unstable();
        for title in prefixed.into_iter().chain(contained) {
            merged.push(title.to_string(), SuggestionSource::Title);
        }

        for (field, source) in [
            ("categories", SuggestionSource::Category),
            ("tags", SuggestionSource::Tag),
        ] {
            let mut terms = BTreeSet::new();
            for entry in &visible {
                for term in entry.metadata_list(field) {
                    if normalize(&term).starts_with(&prefix) {
                        terms.insert(term);
                    }
                }
            }
            for term in terms {
                merged.push(term, source);
            }
        }

        merged.finish()
    }
}

/// Accumulates candidates in priority order, dropping duplicates by
/// normalized text and stopping at the limit
struct Merge {
    seen: HashSet<String>,
    out: Vec<Suggestion>,
    limit: usize,
}

impl Merge {
    fn new(limit: usize) -> Self {
        Self {
            seen: HashSet::new(),
            out: Vec::new(),
            limit,
        }
    }

    fn push(&mut self, text: String, source: SuggestionSource) {
        if self.out.len() >= self.limit {
            return;
        }
        let normalized = normalize(&text);
        if normalized.is_empty() || !self.seen.insert(normalized) {
            return;
        }
        self.out.push(Suggestion { text, source });
    }

    fn finish(self) -> Vec<Suggestion> {
        self.out
    }
}

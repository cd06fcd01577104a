use crate::config::QueryConfig;
use crate::models::{EntryKey, IndexEntry, ObjectType};
use crate::search::error::{SearchError, SearchResult};
use crate::search::request::{OrderBy, SearchHit, SearchRequest, SearchResponse};
use crate::search::synonyms::SynonymMap;
use crate::store::{FieldHits, IndexStore};
use crate::text::{bounded_levenshtein, tokenize};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

struct ScoredEntry {
    entry: IndexEntry,
    score: f64,
    views: u64,
}

/// Executes ranked, filtered, paginated searches against the index store
pub struct QueryEngine {
    store: Arc<IndexStore>,
    config: QueryConfig,
    synonyms: SynonymMap,
}

impl QueryEngine {
    pub fn new(store: Arc<IndexStore>, config: QueryConfig) -> Self {
        let synonyms = SynonymMap::from_config(&config.synonyms);
        Self {
            store,
            config,
            synonyms,
        }
    }

    /// Page size applied when a request leaves per_page unset
    pub fn default_per_page(&self) -> usize {
        self.config.default_per_page
    }

    /// Execute a search. Requests with invalid pagination are rejected
    /// before the store is touched; an empty or all-stopword query yields an
    /// empty (valid) response.
    pub fn search(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        self.validate(request)?;

        let tokens = tokenize(&request.query, self.config.min_token_len);
        if tokens.is_empty() {
            return Ok(SearchResponse::empty(request.page, request.per_page));
        }

        let text_scores = self.match_tokens(&tokens);
        if text_scores.is_empty() {
            return Ok(SearchResponse::empty(request.page, request.per_page));
        }

        let now = Utc::now();
        let mut matched: Vec<ScoredEntry> = Vec::with_capacity(text_scores.len());
        for (key, text_score) in text_scores {
            let Some(entry) = self.store.get(&key) else {
                continue;
            };
            if !entry.is_visible() || !request.type_filter.matches(entry.object_type) {
                continue;
            }

            let views = entry.views();
            let mut score = text_score;
            if request.order_by == OrderBy::Relevance {
                let age_days =
                    (now - entry.modified_at).num_seconds().max(0) as f64 / 86_400.0;
                score += self.config.recency_weight / (1.0 + age_days);
                if entry.object_type == ObjectType::Post {
                    score += self.config.views_weight * (1.0 + views as f64).ln();
                }
            }
            matched.push(ScoredEntry {
                entry,
                score,
                views,
            });
        }

        matched.sort_by(|a, b| Self::compare(a, b, request.order_by));

        let total = matched.len();
        let per_page = request.per_page;
        let total_pages = total.div_ceil(per_page);
        // Saturate so an absurd page number yields an empty page instead
        // of overflowing the offset
        let results = matched
            .iter()
            .skip((request.page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|s| SearchHit::from_entry(&s.entry, s.score))
            .collect();

        tracing::debug!(
            query = %request.query,
            total,
            page = request.page,
            "Search executed"
        );

        Ok(SearchResponse {
            results,
            total,
            total_pages,
            page: request.page,
            per_page,
        })
    }

    fn validate(&self, request: &SearchRequest) -> SearchResult<()> {
        if request.page == 0 {
            return Err(SearchError::InvalidPagination(
                "page must be >= 1".to_string(),
            ));
        }
        if request.per_page == 0 {
            return Err(SearchError::InvalidPagination(
                "per_page must be >= 1".to_string(),
            ));
        }
        if request.per_page > self.config.max_per_page {
            return Err(SearchError::InvalidPagination(format!(
                "per_page must be <= {}",
                self.config.max_per_page
            )));
        }
        Ok(())
    }

    /// Accumulate field-weighted text scores per entry across all query
    /// tokens. Accumulation order is fixed (token order, then synonym order,
    /// then sorted fuzzy terms) so repeated identical queries produce
    /// bit-identical scores.
    fn match_tokens(&self, tokens: &[String]) -> HashMap<EntryKey, f64> {
        let mut scores: HashMap<EntryKey, f64> = HashMap::new();

        for token in tokens {
            let variants = if self.config.synonyms_enabled {
                self.synonyms.expand(token)
            } else {
                vec![token.clone()]
            };

            let mut token_scores: HashMap<EntryKey, f64> = HashMap::new();
            for variant in &variants {
                if let Some(postings) = self.store.postings(variant) {
                    for (key, hits) in postings {
                        *token_scores.entry(key).or_default() += self.field_score(&hits);
                    }
                }
            }

            // Fuzzy fallback only when the token has no exact match at all,
            // so precise queries are never over-broadened
            if token_scores.is_empty() && self.config.fuzzy_enabled {
                for term in self.fuzzy_terms(token) {
                    if let Some(postings) = self.store.postings(&term) {
                        for (key, hits) in postings {
                            *token_scores.entry(key).or_default() +=
                                self.field_score(&hits) * self.config.fuzzy_penalty;
                        }
                    }
                }
            }

            for (key, score) in token_scores {
                *scores.entry(key).or_default() += score;
            }
        }

        scores
    }

    /// Indexed terms within the edit-distance tolerance of the token,
    /// sorted for deterministic accumulation
    fn fuzzy_terms(&self, token: &str) -> Vec<String> {
        let max_distance = if token.chars().count() <= 4 {
            self.config.max_edit_distance.min(1)
        } else {
            self.config.max_edit_distance
        };

        let mut terms: Vec<String> = self
            .store
            .vocabulary()
            .into_iter()
            .filter(|term| bounded_levenshtein(token, term, max_distance).is_some())
            .collect();
        terms.sort_unstable();
        terms
    }

    fn field_score(&self, hits: &FieldHits) -> f64 {
        f64::from(hits.title) * self.config.title_weight
            + f64::from(hits.content) * self.config.content_weight
            + f64::from(hits.excerpt) * self.config.excerpt_weight
    }

    /// Deterministic ordering: requested sort key, then modified_at desc,
    /// then object_id asc, then object type
    fn compare(a: &ScoredEntry, b: &ScoredEntry, order_by: OrderBy) -> Ordering {
        let primary = match order_by {
            OrderBy::Relevance => b
                .score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal),
            OrderBy::Date => Ordering::Equal,
            OrderBy::Views => b.views.cmp(&a.views),
        };

        primary
            .then_with(|| b.entry.modified_at.cmp(&a.entry.modified_at))
            .then_with(|| a.entry.object_id.cmp(&b.entry.object_id))
            .then_with(|| (a.entry.object_type as u8).cmp(&(b.entry.object_type as u8)))
    }
}

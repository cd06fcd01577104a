//! Ranked full-text query engine over the index store.
//!
//! Query execution pipeline:
//!
//! 1. Tokenize the query, discarding stopwords and short tokens.
//! 2. Expand each token to the union of its configured synonyms.
//! 3. Look up exact postings per token; when a token has no exact match
//!    anywhere, fall back to fuzzy matching within a bounded edit distance
//!    (precise queries are never broadened).
//! 4. Score entries by weighted field matches (title > content > excerpt),
//!    plus recency and post-view signals under relevance ordering.
//! 5. Filter to visible entries of the requested type, sort by the requested
//!    order with deterministic tie-breaks, and paginate.
//!
//! An empty or all-stopword query returns zero results rather than matching
//! everything; zero results is a valid outcome, not an error.

mod engine;
mod error;
mod request;
mod synonyms;

pub use engine::QueryEngine;
pub use error::{SearchError, SearchResult};
pub use request::{OrderBy, SearchHit, SearchRequest, SearchResponse, TypeFilter};
pub use synonyms::SynonymMap;

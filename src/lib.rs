//! Full-text search and indexing for blog CMS content.
//!
//! Posts, comments, and user profiles are mirrored into an in-process
//! inverted index that serves ranked search, autocomplete suggestions, and
//! search analytics over an HTTP API. The index is maintained incrementally
//! from content lifecycle events and can be rebuilt in resumable batches.

pub mod analytics;
pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod indexer;
pub mod models;
pub mod search;
pub mod store;
pub mod suggest;
pub mod text;

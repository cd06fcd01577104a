pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::analytics::AnalyticsEngine;
use crate::indexer::{Indexer, JobRegistry};
use crate::search::QueryEngine;
use crate::store::IndexStore;
use crate::suggest::SuggestionService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<IndexStore>,
    pub indexer: Arc<Indexer>,
    pub engine: Arc<QueryEngine>,
    pub suggester: Arc<SuggestionService>,
    pub analytics: Arc<AnalyticsEngine>,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    pub fn new(
        store: Arc<IndexStore>,
        indexer: Arc<Indexer>,
        engine: Arc<QueryEngine>,
        suggester: Arc<SuggestionService>,
        analytics: Arc<AnalyticsEngine>,
    ) -> Self {
        Self {
            store,
            indexer,
            engine,
            suggester,
            analytics,
            jobs: Arc::new(JobRegistry::new()),
        }
    }
}

use crate::models::{IndexEntry, ObjectType};
use crate::search::error::SearchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Restricts a search to one object type, or none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    #[default]
    All,
    Post,
    Comment,
    User,
}

impl TypeFilter {
    /// Whether an entry of the given type survives this filter. Filtering
    /// never changes relative ranking among surviving entries.
    pub fn matches(&self, object_type: ObjectType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Post => object_type == ObjectType::Post,
            TypeFilter::Comment => object_type == ObjectType::Comment,
            TypeFilter::User => object_type == ObjectType::User,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TypeFilter::All),
            "post" => Ok(TypeFilter::Post),
            "comment" => Ok(TypeFilter::Comment),
            "user" => Ok(TypeFilter::User),
            other => Err(SearchError::InvalidTypeFilter(other.to_string())),
        }
    }
}

/// Requested result ordering
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderBy {
    /// Score descending (field-weighted matches + recency/views signals)
    #[default]
    Relevance,
    /// `modified_at` descending
    Date,
    /// View count descending (posts; others count as zero views)
    Views,
}

/// A validated-on-execution search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    #[serde(default)]
    pub type_filter: TypeFilter,

    /// 1-based page number
    pub page: usize,

    pub per_page: usize,

    #[serde(default)]
    pub order_by: OrderBy,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            type_filter: TypeFilter::All,
            page: 1,
            per_page: 10,
            order_by: OrderBy::Relevance,
        }
    }

    pub fn with_type(mut self, type_filter: TypeFilter) -> Self {
        self.type_filter = type_filter;
        self
    }

    pub fn with_page(mut self, page: usize, per_page: usize) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn with_order(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }
}

/// One ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub object_id: u64,
    pub object_type: ObjectType,
    pub title: String,
    pub excerpt: String,
    pub author_id: u64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub score: f64,
    pub metadata: HashMap<String, String>,
}

impl SearchHit {
    pub fn from_entry(entry: &IndexEntry, score: f64) -> Self {
        Self {
            object_id: entry.object_id,
            object_type: entry.object_type,
            title: entry.title.clone(),
            excerpt: entry.excerpt.clone(),
            author_id: entry.author_id,
            author_name: entry.author_name.clone(),
            created_at: entry.created_at,
            modified_at: entry.modified_at,
            score,
            metadata: entry.metadata.clone(),
        }
    }
}

/// Paginated result envelope. `total` is always the full match count,
/// independent of pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub total_pages: usize,
    pub page: usize,
    pub per_page: usize,
}

impl SearchResponse {
    pub fn empty(page: usize, per_page: usize) -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            total_pages: 0,
            page,
            per_page,
        }
    }
}

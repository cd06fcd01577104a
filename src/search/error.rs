//! Error types for search operations

use crate::error::AppError;
use crate::store::StoreError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Invalid pagination parameters (rejected before touching the store)
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// Unknown type filter value
    #[error("Unknown type filter: {0}")]
    InvalidTypeFilter(String),

    /// Unknown sort order value
    #[error("Unknown sort order: {0}")]
    InvalidOrder(String),

    /// Store failure while executing the search
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidPagination(_)
            | SearchError::InvalidTypeFilter(_)
            | SearchError::InvalidOrder(_) => AppError::Validation(err.to_string()),
            SearchError::Store(e) => e.into(),
        }
    }
}

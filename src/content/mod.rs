//! Content store collaborator interface.
//!
//! The CMS owns posts, comments, and user profiles; this service only
//! consumes them through the narrow [`ContentStore`] capability plus the
//! lifecycle events in [`events`]. Production deployments wire an adapter to
//! the real CMS; tests and the standalone demo use [`InMemoryContentStore`].

mod events;
mod memory;

pub use events::{ContentEvent, ContentEventSender, IndexWorker};
pub use memory::InMemoryContentStore;

use crate::models::{ObjectType, SourceObject};
use async_trait::async_trait;

/// Result type for content store operations
pub type ContentResult<T> = std::result::Result<T, ContentError>;

/// Errors surfaced by the content store collaborator
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The collaborator is unreachable or failed internally
    #[error("Content store unavailable: {0}")]
    Unavailable(String),

    /// A specific object could not be loaded or decoded
    #[error("Malformed object {object_type}:{object_id}: {message}")]
    MalformedObject {
        object_id: u64,
        object_type: ObjectType,
        message: String,
    },
}

/// Read access to the content store that owns the source objects
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Load the current state of one object; `None` if it does not exist
    async fn load_object(
        &self,
        object_id: u64,
        object_type: ObjectType,
    ) -> ContentResult<Option<SourceObject>>;

    /// List object ids of one type, ordered by id, for batched iteration
    async fn list_objects(
        &self,
        object_type: ObjectType,
        offset: u64,
        limit: usize,
    ) -> ContentResult<Vec<u64>>;

    /// Total number of objects of one type (indexable or not)
    async fn count_objects(&self, object_type: ObjectType) -> ContentResult<u64>;

    /// Whether the object still exists in the source store
    async fn object_exists(&self, object_id: u64, object_type: ObjectType) -> ContentResult<bool> {
        Ok(self.load_object(object_id, object_type).await?.is_some())
    }
}

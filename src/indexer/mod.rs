//! Keeps the index store synchronized with the content store.
//!
//! Incremental maintenance (`upsert`/`remove`) is driven by content
//! lifecycle events through the [`crate::content::IndexWorker`]; bulk
//! maintenance (`rebuild`, `optimize`) runs as cancellable background jobs
//! with progress reporting (see [`job`]).

mod job;

pub use job::{
    JobHandle, JobKind, JobProgress, JobRegistry, JobState, RebuildOptions, RebuildTarget,
};

use crate::config::IndexingConfig;
use crate::content::{ContentError, ContentStore};
use crate::error::AppError;
use crate::models::{EntryKey, IndexEntry, ObjectType};
use crate::store::{ApplyOutcome, IndexStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Result type for indexing operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Errors from indexing operations
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The source object could not be loaded; skippable within a batch
    /// unless the collaborator itself is down
    #[error(transparent)]
    Content(#[from] ContentError),

    /// Index storage failure; always fatal for the running batch
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IndexError {
    /// Per-item errors are recorded and skipped during `rebuild`; anything
    /// else aborts the batch
    pub fn is_per_item(&self) -> bool {
        matches!(self, IndexError::Content(ContentError::MalformedObject { .. }))
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Content(e) => AppError::ContentStore(e.to_string()),
            IndexError::Store(e) => e.into(),
        }
    }
}

/// What `upsert` did with the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The object was indexable and its entry was written
    Indexed,
    /// A newer entry was already stored; the write was dropped
    Stale,
    /// The object is gone or not indexable; any existing entry was removed
    Removed,
    /// The object is gone or not indexable and no entry existed
    Absent,
}

/// Per-type index counts and freshness
#[derive(Debug, Clone, Serialize)]
pub struct IndexerStats {
    pub counts: HashMap<ObjectType, u64>,
    pub total: u64,
    pub last_write_at: Option<DateTime<Utc>>,
}

/// Synchronizes the index store with content lifecycle state. Cloning is
/// cheap; background jobs run on their own clone.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<IndexStore>,
    content: Arc<dyn ContentStore>,
    config: IndexingConfig,
}

impl Indexer {
    pub fn new(
        store: Arc<IndexStore>,
        content: Arc<dyn ContentStore>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            store,
            content,
            config,
        }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub(crate) fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    pub(crate) fn config(&self) -> &IndexingConfig {
        &self.config
    }

    /// Load the object's current state and reconcile its index entry:
    /// indexable objects are written (last-writer-wins), everything else is
    /// removed. Applying this twice with no intervening change stores the
    /// same entry.
    pub async fn upsert(&self, object_id: u64, object_type: ObjectType) -> IndexResult<UpsertOutcome> {
        let key = EntryKey::new(object_id, object_type);

        match self.content.load_object(object_id, object_type).await? {
            Some(source) if source.status.is_indexable_for(object_type) => {
                let entry = IndexEntry::from_source(source);
                match self.store.apply(entry)? {
                    ApplyOutcome::Stored => {
                        if self.config.realtime_persist {
                            self.store.flush()?;
                        }
                        tracing::debug!(key = %key, "Index entry upserted");
                        Ok(UpsertOutcome::Indexed)
                    }
                    ApplyOutcome::Stale => Ok(UpsertOutcome::Stale),
                }
            }
            _ => {
                if self.store.remove(&key)? {
                    tracing::debug!(key = %key, "Index entry removed (not indexable)");
                    Ok(UpsertOutcome::Removed)
                } else {
                    Ok(UpsertOutcome::Absent)
                }
            }
        }
    }

    /// Delete the entry if present; no-op otherwise
    pub async fn remove(&self, object_id: u64, object_type: ObjectType) -> IndexResult<bool> {
        let key = EntryKey::new(object_id, object_type);
        let removed = self.store.remove(&key)?;
        if removed {
            if self.config.realtime_persist {
                self.store.flush()?;
            }
            tracing::debug!(key = %key, "Index entry removed");
        }
        Ok(removed)
    }

    /// Per-type indexed counts and the most recent successful write
    pub fn stats(&self) -> IndexerStats {
        let counts = self.store.count_by_type();
        let total = counts.values().sum();
        IndexerStats {
            counts,
            total,
            last_write_at: self.store.last_write_at(),
        }
    }

    /// Remove orphaned entries whose source object no longer exists, then
    /// compact the store. Returns the number of orphans removed.
    pub async fn optimize(&self) -> IndexResult<u64> {
        let flag = std::sync::atomic::AtomicBool::new(false);
        self.optimize_inner(&flag, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::InMemoryContentStore;
    use crate::models::{ContentStatus, SourceObject};
    use std::collections::HashMap as StdHashMap;

    fn source(id: u64, object_type: ObjectType, status: ContentStatus, title: &str) -> SourceObject {
        let now = Utc::now();
        SourceObject {
            id,
            object_type,
            title: title.into(),
            content: "body".into(),
            excerpt: String::new(),
            author_id: 1,
            author_name: "alice".into(),
            created_at: now,
            modified_at: now,
            status,
            metadata: StdHashMap::new(),
        }
    }

    fn setup() -> (Indexer, Arc<InMemoryContentStore>) {
        let store = Arc::new(IndexStore::in_memory(2));
        let content = Arc::new(InMemoryContentStore::new());
        let indexer = Indexer::new(store, content.clone(), IndexingConfig::default());
        (indexer, content)
    }

    #[tokio::test]
    async fn test_upsert_indexes_visible_objects() {
        let (indexer, content) = setup();
        content.put(source(1, ObjectType::Post, ContentStatus::Publish, "Rust Guide"));

        let outcome = indexer.upsert(1, ObjectType::Post).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Indexed);
        assert!(indexer.store().contains(&EntryKey::new(1, ObjectType::Post)));
    }

    #[tokio::test]
    async fn test_upsert_removes_unpublished() {
        let (indexer, content) = setup();
        content.put(source(1, ObjectType::Post, ContentStatus::Publish, "Rust Guide"));
        indexer.upsert(1, ObjectType::Post).await.unwrap();

        content.put(source(1, ObjectType::Post, ContentStatus::Draft, "Rust Guide"));
        let outcome = indexer.upsert(1, ObjectType::Post).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Removed);
        assert!(!indexer.store().contains(&EntryKey::new(1, ObjectType::Post)));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (indexer, content) = setup();
        content.put(source(1, ObjectType::Post, ContentStatus::Publish, "Rust Guide"));

        indexer.upsert(1, ObjectType::Post).await.unwrap();
        let first = indexer.store().get(&EntryKey::new(1, ObjectType::Post)).unwrap();

        indexer.upsert(1, ObjectType::Post).await.unwrap();
        let second = indexer.store().get(&EntryKey::new(1, ObjectType::Post)).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (indexer, _content) = setup();
        assert!(!indexer.remove(99, ObjectType::Comment).await.unwrap());
    }

    #[tokio::test]
    async fn test_comment_approval_transition() {
        let (indexer, content) = setup();
        content.put(source(
            5,
            ObjectType::Comment,
            ContentStatus::PendingReview,
            "insightful remark",
        ));

        indexer.upsert(5, ObjectType::Comment).await.unwrap();
        assert!(!indexer.store().contains(&EntryKey::new(5, ObjectType::Comment)));

        content.put(source(
            5,
            ObjectType::Comment,
            ContentStatus::Approved,
            "insightful remark",
        ));
        indexer.upsert(5, ObjectType::Comment).await.unwrap();
        assert!(indexer.store().contains(&EntryKey::new(5, ObjectType::Comment)));
    }

    #[tokio::test]
    async fn test_stats_counts_per_type() {
        let (indexer, content) = setup();
        content.put(source(1, ObjectType::Post, ContentStatus::Publish, "One"));
        content.put(source(2, ObjectType::Post, ContentStatus::Publish, "Two"));
        content.put(source(3, ObjectType::Comment, ContentStatus::Approved, "Three"));

        for (id, ty) in [
            (1, ObjectType::Post),
            (2, ObjectType::Post),
            (3, ObjectType::Comment),
        ] {
            indexer.upsert(id, ty).await.unwrap();
        }

        let stats = indexer.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.counts.get(&ObjectType::Post), Some(&2));
        assert_eq!(stats.counts.get(&ObjectType::Comment), Some(&1));
        assert!(stats.last_write_at.is_some());
    }

    #[tokio::test]
    async fn test_optimize_removes_orphans() {
        let (indexer, content) = setup();
        content.put(source(1, ObjectType::Post, ContentStatus::Publish, "Keep"));
        content.put(source(2, ObjectType::Post, ContentStatus::Publish, "Orphan"));
        indexer.upsert(1, ObjectType::Post).await.unwrap();
        indexer.upsert(2, ObjectType::Post).await.unwrap();

        // Deleted at the source without a lifecycle event reaching us
        content.delete(2, ObjectType::Post);

        let removed = indexer.optimize().await.unwrap();
        assert_eq!(removed, 1);
        assert!(indexer.store().contains(&EntryKey::new(1, ObjectType::Post)));
        assert!(!indexer.store().contains(&EntryKey::new(2, ObjectType::Post)));
    }
}

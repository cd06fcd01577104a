//! The Index Store: one live, denormalized entry per (object_id, object_type).
//!
//! Authoritative rows live in a concurrent map, searchable through a
//! maintained in-process inverted index ([`TextIndex`]) with per-field term
//! frequencies. With the sled backend enabled, rows are written through to
//! disk and reloaded (postings rebuilt) at open.
//!
//! Writes are atomic per key: the row and its postings are updated inside a
//! per-key critical section, so concurrent edits to different objects never
//! interleave, and concurrent edits to the same object converge to
//! last-writer-wins on `modified_at`.

mod persist;
mod text_index;

pub use persist::{open_db, SledPersistence};
pub use text_index::{FieldHits, TextIndex};

use crate::error::AppError;
use crate::models::{EntryKey, IndexEntry, ObjectType};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors from the index store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying storage failed (treated as fatal by batch jobs)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A stored row could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Persistence(msg) => AppError::Storage(msg),
            StoreError::Serialization(msg) => AppError::Serialization(msg),
        }
    }
}

/// Outcome of applying an entry write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The entry was stored (created or replaced an older version)
    Stored,
    /// A newer version was already present; the write was dropped
    Stale,
}

/// Shared index store written by the indexer and read by the query engine
/// and suggestion service
pub struct IndexStore {
    rows: DashMap<EntryKey, IndexEntry>,
    text: RwLock<TextIndex>,
    persist: Option<SledPersistence>,
    /// Per-key write serialization; row + postings move as a unit
    locks: DashMap<EntryKey, Arc<Mutex<()>>>,
    /// Rebuild cursors, mirrored to the meta tree when persistence is on
    cursors: DashMap<ObjectType, u64>,
    last_write: RwLock<Option<DateTime<Utc>>>,
    min_token_len: usize,
}

impl IndexStore {
    /// Create an in-memory store (tests, memory backend)
    pub fn in_memory(min_token_len: usize) -> Self {
        Self {
            rows: DashMap::new(),
            text: RwLock::new(TextIndex::new(min_token_len)),
            persist: None,
            locks: DashMap::new(),
            cursors: DashMap::new(),
            last_write: RwLock::new(None),
            min_token_len,
        }
    }

    /// Open a sled-backed store, reloading persisted rows and rebuilding
    /// the inverted index
    pub fn persistent(db: sled::Db, min_token_len: usize) -> StoreResult<Self> {
        let persist = SledPersistence::new(db)?;
        let store = Self {
            rows: DashMap::new(),
            text: RwLock::new(TextIndex::new(min_token_len)),
            persist: Some(persist),
            locks: DashMap::new(),
            cursors: DashMap::new(),
            last_write: RwLock::new(None),
            min_token_len,
        };

        let entries = store
            .persist
            .as_ref()
            .map(|p| p.load_entries())
            .transpose()?
            .unwrap_or_default();
        {
            let text = store.text.read();
            for entry in entries {
                text.add_entry(&entry);
                store.rows.insert(entry.key(), entry);
            }
        }

        if let Some(p) = &store.persist {
            for object_type in ObjectType::ALL {
                if let Some(offset) = p.load_cursor(object_type)? {
                    store.cursors.insert(object_type, offset);
                }
            }
        }

        tracing::info!(entries = store.rows.len(), "Index store loaded");
        Ok(store)
    }

    fn key_lock(&self, key: &EntryKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(*key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Insert or replace an entry. Last-writer-wins on `modified_at`: an
    /// incoming entry older than the stored one is dropped, which is how a
    /// rebuild racing a live upsert on the same key is resolved.
    pub fn apply(&self, entry: IndexEntry) -> StoreResult<ApplyOutcome> {
        let key = entry.key();
        let lock = self.key_lock(&key);
        let _guard = lock.lock();

        let old = self.rows.get(&key).map(|r| r.clone());
        if let Some(ref old) = old {
            if old.modified_at > entry.modified_at {
                tracing::debug!(key = %key, "Dropping stale index write");
                return Ok(ApplyOutcome::Stale);
            }
        }

        // Persist first so a storage failure leaves memory untouched
        if let Some(p) = &self.persist {
            p.save_entry(&entry)?;
        }

        let text = self.text.read();
        if let Some(ref old) = old {
            text.remove_entry(old);
        }
        text.add_entry(&entry);
        drop(text);

        self.rows.insert(key, entry);
        *self.last_write.write() = Some(Utc::now());
        Ok(ApplyOutcome::Stored)
    }

    /// Delete the entry if present; returns whether anything was removed
    pub fn remove(&self, key: &EntryKey) -> StoreResult<bool> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();

        let Some(old) = self.rows.get(key).map(|r| r.clone()) else {
            return Ok(false);
        };

        if let Some(p) = &self.persist {
            p.delete_entry(key)?;
        }

        self.text.read().remove_entry(&old);
        self.rows.remove(key);
        *self.last_write.write() = Some(Utc::now());
        Ok(true)
    }

    pub fn get(&self, key: &EntryKey) -> Option<IndexEntry> {
        self.rows.get(key).map(|r| r.clone())
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All entry keys, sorted for deterministic iteration
    pub fn keys(&self) -> Vec<EntryKey> {
        let mut keys: Vec<EntryKey> = self.rows.iter().map(|r| *r.key()).collect();
        keys.sort_by_key(|k| (k.object_type as u8, k.object_id));
        keys
    }

    /// Entry keys of one type, sorted by object id
    pub fn keys_of_type(&self, object_type: ObjectType) -> Vec<EntryKey> {
        let mut keys: Vec<EntryKey> = self
            .rows
            .iter()
            .map(|r| *r.key())
            .filter(|k| k.object_type == object_type)
            .collect();
        keys.sort_by_key(|k| k.object_id);
        keys
    }

    /// Snapshot of every visible entry
    pub fn visible_snapshot(&self) -> Vec<IndexEntry> {
        self.rows
            .iter()
            .filter(|r| r.value().is_visible())
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn count_by_type(&self) -> HashMap<ObjectType, u64> {
        let mut counts = HashMap::new();
        for row in self.rows.iter() {
            *counts.entry(row.key().object_type).or_insert(0) += 1;
        }
        counts
    }

    /// Remove every entry of one type; used by `rebuild(clear_first)`
    pub fn clear_type(&self, object_type: ObjectType) -> StoreResult<u64> {
        let mut removed = 0;
        for key in self.keys_of_type(object_type) {
            if self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Postings snapshot for one token
    pub fn postings(&self, token: &str) -> Option<HashMap<EntryKey, FieldHits>> {
        self.text.read().lookup(token)
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.text.read().has_token(token)
    }

    /// Indexed vocabulary for fuzzy scans
    pub fn vocabulary(&self) -> Vec<String> {
        self.text.read().vocabulary()
    }

    /// Rebuild the inverted index from the rows (dropping tombstoned
    /// postings) and flush persisted state
    pub fn compact(&self) -> StoreResult<()> {
        // The write guard is held across the row scan so a concurrent
        // apply() cannot slip its row in between the scan and the swap and
        // end up with no postings. apply() blocks on text.read() while this
        // runs; the scan takes no key locks, so there is no deadlock.
        {
            let mut text = self.text.write();
            let fresh = TextIndex::new(self.min_token_len);
            for row in self.rows.iter() {
                fresh.add_entry(row.value());
            }
            *text = fresh;
        }

        // Lock table entries for deleted keys are no longer needed
        self.locks.retain(|key, _| self.rows.contains_key(key));

        if let Some(p) = &self.persist {
            p.flush()?;
        }
        tracing::debug!(
            entries = self.rows.len(),
            tokens = self.text.read().token_count(),
            "Index store compacted"
        );
        Ok(())
    }

    /// Force persisted writes to disk; no-op without the sled backend
    pub fn flush(&self) -> StoreResult<()> {
        if let Some(p) = &self.persist {
            p.flush()?;
        }
        Ok(())
    }

    pub fn last_write_at(&self) -> Option<DateTime<Utc>> {
        *self.last_write.read()
    }

    /// Committed rebuild offset for one type (0 when no rebuild is pending)
    pub fn rebuild_cursor(&self, object_type: ObjectType) -> u64 {
        self.cursors.get(&object_type).map(|c| *c).unwrap_or(0)
    }

    pub fn set_rebuild_cursor(&self, object_type: ObjectType, offset: u64) -> StoreResult<()> {
        if let Some(p) = &self.persist {
            p.save_cursor(object_type, offset)?;
        }
        self.cursors.insert(object_type, offset);
        Ok(())
    }

    pub fn clear_rebuild_cursor(&self, object_type: ObjectType) -> StoreResult<()> {
        if let Some(p) = &self.persist {
            p.clear_cursor(object_type)?;
        }
        self.cursors.remove(&object_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentStatus;
    use chrono::Duration;
    use std::collections::HashMap as StdHashMap;
    use tempfile::TempDir;

    fn entry(id: u64, title: &str, modified_offset_secs: i64) -> IndexEntry {
        let now = Utc::now();
        IndexEntry {
            object_id: id,
            object_type: ObjectType::Post,
            title: title.into(),
            content: "body text".into(),
            excerpt: String::new(),
            author_id: 1,
            author_name: "alice".into(),
            created_at: now,
            modified_at: now + Duration::seconds(modified_offset_secs),
            status: ContentStatus::Publish,
            metadata: StdHashMap::new(),
        }
    }

    #[test]
    fn test_apply_and_postings() {
        let store = IndexStore::in_memory(2);
        assert_eq!(
            store.apply(entry(1, "Rust Guide", 0)).unwrap(),
            ApplyOutcome::Stored
        );

        let postings = store.postings("rust").unwrap();
        assert!(postings.contains_key(&EntryKey::new(1, ObjectType::Post)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_apply_replaces_postings() {
        let store = IndexStore::in_memory(2);
        store.apply(entry(1, "Rust Guide", 0)).unwrap();
        store.apply(entry(1, "Python Guide", 10)).unwrap();

        assert!(store.postings("rust").is_none());
        assert!(store.postings("python").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_last_writer_wins_on_modified_at() {
        let store = IndexStore::in_memory(2);
        store.apply(entry(1, "Newer", 100)).unwrap();
        assert_eq!(
            store.apply(entry(1, "Older", 0)).unwrap(),
            ApplyOutcome::Stale
        );

        let key = EntryKey::new(1, ObjectType::Post);
        assert_eq!(store.get(&key).unwrap().title, "Newer");
        assert!(store.postings("older").is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = IndexStore::in_memory(2);
        store.apply(entry(1, "Rust Guide", 0)).unwrap();

        let key = EntryKey::new(1, ObjectType::Post);
        assert!(store.remove(&key).unwrap());
        assert!(!store.remove(&key).unwrap());
        assert!(store.postings("rust").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_type_and_counts() {
        let store = IndexStore::in_memory(2);
        store.apply(entry(1, "One", 0)).unwrap();
        store.apply(entry(2, "Two", 0)).unwrap();

        let counts = store.count_by_type();
        assert_eq!(counts.get(&ObjectType::Post), Some(&2));

        assert_eq!(store.clear_type(ObjectType::Post).unwrap(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_persistent_reload() {
        let dir = TempDir::new().unwrap();
        {
            let db = open_db(dir.path()).unwrap();
            let store = IndexStore::persistent(db, 2).unwrap();
            store.apply(entry(1, "Rust Guide", 0)).unwrap();
            store.set_rebuild_cursor(ObjectType::Post, 7).unwrap();
            store.compact().unwrap();
        }

        let db = open_db(dir.path()).unwrap();
        let reopened = IndexStore::persistent(db, 2).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.postings("rust").is_some());
        assert_eq!(reopened.rebuild_cursor(ObjectType::Post), 7);
    }

    #[test]
    fn test_compact_racing_writes_keeps_every_entry_searchable() {
        let store = Arc::new(IndexStore::in_memory(2));
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for id in 0..500 {
                    store
                        .apply(entry(id, &format!("Rust topic {id}"), 0))
                        .unwrap();
                }
            })
        };

        for _ in 0..200 {
            store.compact().unwrap();
        }
        writer.join().unwrap();

        // Every stored row must remain reachable through its postings no
        // matter how the compactions interleaved with the writes
        let postings = store.postings("rust").unwrap();
        assert_eq!(postings.len(), 500);
        for key in store.keys() {
            assert!(postings.contains_key(&key));
        }
    }

    #[test]
    fn test_compact_preserves_postings() {
        let store = IndexStore::in_memory(2);
        store.apply(entry(1, "Rust Guide", 0)).unwrap();
        store.apply(entry(2, "Go Guide", 0)).unwrap();
        store.remove(&EntryKey::new(2, ObjectType::Post)).unwrap();

        store.compact().unwrap();
        assert!(store.postings("rust").is_some());
        assert!(store.postings("go").is_none());
    }
}

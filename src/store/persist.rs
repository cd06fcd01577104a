use crate::models::{EntryKey, IndexEntry, ObjectType};
use crate::store::StoreError;
use std::path::Path;
use std::time::Duration;

const READ_RETRIES: u32 = 3;
const READ_BACKOFF_MS: u64 = 50;

/// Open (or create) the embedded database shared by the index store and the
/// analytics engine; each component uses its own trees.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<sled::Db, StoreError> {
    sled::open(path.as_ref())
        .map_err(|e| StoreError::Persistence(format!("Failed to open database: {e}")))
}

/// Sled-backed persistence for index entries and indexer metadata.
/// Writes are write-through from the in-memory store; rows are reloaded and
/// postings rebuilt at open.
pub struct SledPersistence {
    db: sled::Db,
    entries: sled::Tree,
    meta: sled::Tree,
}

impl SledPersistence {
    pub fn new(db: sled::Db) -> Result<Self, StoreError> {
        let entries = db
            .open_tree("entries")
            .map_err(|e| StoreError::Persistence(format!("Failed to open entries tree: {e}")))?;
        let meta = db
            .open_tree("meta")
            .map_err(|e| StoreError::Persistence(format!("Failed to open meta tree: {e}")))?;

        Ok(Self { db, entries, meta })
    }

    pub fn save_entry(&self, entry: &IndexEntry) -> Result<(), StoreError> {
        let value = bincode::serialize(entry)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize entry: {e}")))?;
        self.entries
            .insert(entry.key().storage_key().as_bytes(), value)
            .map_err(|e| StoreError::Persistence(format!("Failed to save entry: {e}")))?;
        Ok(())
    }

    pub fn delete_entry(&self, key: &EntryKey) -> Result<(), StoreError> {
        self.entries
            .remove(key.storage_key().as_bytes())
            .map_err(|e| StoreError::Persistence(format!("Failed to delete entry: {e}")))?;
        Ok(())
    }

    /// Load every persisted entry. Transient read failures are retried with
    /// backoff; individually corrupt rows are logged and skipped.
    pub fn load_entries(&self) -> Result<Vec<IndexEntry>, StoreError> {
        let mut attempt = 0;
        loop {
            match self.try_load_entries() {
                Ok(entries) => return Ok(entries),
                Err(e) if attempt < READ_RETRIES => {
                    attempt += 1;
                    let backoff = Duration::from_millis(READ_BACKOFF_MS * (1 << attempt));
                    tracing::warn!(
                        attempt,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying index load"
                    );
                    std::thread::sleep(backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_load_entries(&self) -> Result<Vec<IndexEntry>, StoreError> {
        let mut entries = Vec::new();
        for item in self.entries.iter() {
            let (key, value) =
                item.map_err(|e| StoreError::Persistence(format!("Failed to read entry: {e}")))?;
            match bincode::deserialize::<IndexEntry>(&value) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "Skipping corrupt index row"
                    );
                }
            }
        }
        Ok(entries)
    }

    fn cursor_key(object_type: ObjectType) -> String {
        format!("rebuild_cursor:{object_type}")
    }

    pub fn save_cursor(&self, object_type: ObjectType, offset: u64) -> Result<(), StoreError> {
        self.meta
            .insert(Self::cursor_key(object_type).as_bytes(), &offset.to_be_bytes())
            .map_err(|e| StoreError::Persistence(format!("Failed to save cursor: {e}")))?;
        Ok(())
    }

    pub fn load_cursor(&self, object_type: ObjectType) -> Result<Option<u64>, StoreError> {
        let value = self
            .meta
            .get(Self::cursor_key(object_type).as_bytes())
            .map_err(|e| StoreError::Persistence(format!("Failed to read cursor: {e}")))?;
        Ok(value.and_then(|v| v.as_ref().try_into().ok().map(u64::from_be_bytes)))
    }

    pub fn clear_cursor(&self, object_type: ObjectType) -> Result<(), StoreError> {
        self.meta
            .remove(Self::cursor_key(object_type).as_bytes())
            .map_err(|e| StoreError::Persistence(format!("Failed to clear cursor: {e}")))?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::Persistence(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}

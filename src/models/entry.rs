use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Kind of content object an index entry is derived from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectType {
    Post,
    Comment,
    User,
}

impl ObjectType {
    /// All object types, in a fixed order
    pub const ALL: [ObjectType; 3] = [ObjectType::Post, ObjectType::Comment, ObjectType::User];
}

/// Publication status of a content object. Interpretation depends on the
/// object type: posts move through publish/draft/pending/private/trash,
/// comments through approved/pending_review/trash, user profiles carry
/// publish while active.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentStatus {
    Publish,
    Draft,
    Pending,
    Private,
    Approved,
    PendingReview,
    Trash,
}

impl ContentStatus {
    /// Whether an object with this status participates in anonymous search.
    /// The indexable set equals the visible set: objects outside it never
    /// have a live index entry.
    pub fn is_indexable_for(&self, object_type: ObjectType) -> bool {
        match object_type {
            ObjectType::Post => matches!(self, ContentStatus::Publish),
            ObjectType::Comment => matches!(self, ContentStatus::Approved),
            ObjectType::User => matches!(self, ContentStatus::Publish),
        }
    }
}

/// Identity of an index entry: exactly one live entry exists per key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub object_id: u64,
    pub object_type: ObjectType,
}

impl EntryKey {
    pub fn new(object_id: u64, object_type: ObjectType) -> Self {
        Self {
            object_id,
            object_type,
        }
    }

    /// Stable byte encoding used as the persisted row key
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.object_type, self.object_id)
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

/// A content object as loaded from the owning content store collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceObject {
    pub id: u64,
    pub object_type: ObjectType,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: u64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub status: ContentStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A denormalized, searchable record derived from one content object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub object_id: u64,
    pub object_type: ObjectType,

    pub title: String,
    pub content: String,
    pub excerpt: String,

    /// Denormalized author fields so results render without a join
    pub author_id: u64,
    pub author_name: String,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    pub status: ContentStatus,

    /// Open key/value map: categories, tags, view counts, avatar URL, etc.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl IndexEntry {
    /// Build an entry from a loaded source object
    pub fn from_source(source: SourceObject) -> Self {
        Self {
            object_id: source.id,
            object_type: source.object_type,
            title: source.title,
            content: source.content,
            excerpt: source.excerpt,
            author_id: source.author_id,
            author_name: source.author_name,
            created_at: source.created_at,
            modified_at: source.modified_at,
            status: source.status,
            metadata: source.metadata,
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.object_id, self.object_type)
    }

    pub fn is_visible(&self) -> bool {
        self.status.is_indexable_for(self.object_type)
    }

    /// View count from metadata; posts only, 0 when absent or malformed
    pub fn views(&self) -> u64 {
        self.metadata
            .get("views")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Comma-separated metadata list field ("categories", "tags")
    pub fn metadata_list(&self, field: &str) -> Vec<String> {
        self.metadata
            .get(field)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(status: ContentStatus, object_type: ObjectType) -> IndexEntry {
        IndexEntry {
            object_id: 7,
            object_type,
            title: "Title".into(),
            content: "Content".into(),
            excerpt: "Excerpt".into(),
            author_id: 1,
            author_name: "alice".into(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
            status,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_visibility_per_type() {
        assert!(sample_entry(ContentStatus::Publish, ObjectType::Post).is_visible());
        assert!(!sample_entry(ContentStatus::Draft, ObjectType::Post).is_visible());
        assert!(!sample_entry(ContentStatus::Pending, ObjectType::Comment).is_visible());
        assert!(sample_entry(ContentStatus::Approved, ObjectType::Comment).is_visible());
        assert!(!sample_entry(ContentStatus::Approved, ObjectType::Post).is_visible());
    }

    #[test]
    fn test_storage_key_roundtrip_identity() {
        let key = EntryKey::new(42, ObjectType::Comment);
        assert_eq!(key.storage_key(), "comment:42");
    }

    #[test]
    fn test_views_parsing() {
        let mut entry = sample_entry(ContentStatus::Publish, ObjectType::Post);
        assert_eq!(entry.views(), 0);
        entry.metadata.insert("views".into(), "120".into());
        assert_eq!(entry.views(), 120);
        entry.metadata.insert("views".into(), "junk".into());
        assert_eq!(entry.views(), 0);
    }

    #[test]
    fn test_metadata_list() {
        let mut entry = sample_entry(ContentStatus::Publish, ObjectType::Post);
        entry
            .metadata
            .insert("tags".into(), "rust, search,  indexing".into());
        assert_eq!(entry.metadata_list("tags"), vec!["rust", "search", "indexing"]);
        assert!(entry.metadata_list("categories").is_empty());
    }
}

use crate::content::{ContentResult, ContentStore};
use crate::models::{ObjectType, SourceObject};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory content store used by tests and the standalone demo deployment
#[derive(Clone, Default)]
pub struct InMemoryContentStore {
    objects: Arc<DashMap<(ObjectType, u64), SourceObject>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object (test/demo fixture setup)
    pub fn put(&self, object: SourceObject) {
        self.objects
            .insert((object.object_type, object.id), object);
    }

    /// Remove an object, simulating a CMS-side delete
    pub fn delete(&self, object_id: u64, object_type: ObjectType) {
        self.objects.remove(&(object_type, object_id));
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn load_object(
        &self,
        object_id: u64,
        object_type: ObjectType,
    ) -> ContentResult<Option<SourceObject>> {
        Ok(self
            .objects
            .get(&(object_type, object_id))
            .map(|entry| entry.clone()))
    }

    async fn list_objects(
        &self,
        object_type: ObjectType,
        offset: u64,
        limit: usize,
    ) -> ContentResult<Vec<u64>> {
        // Sorted so batched iteration is deterministic and resumable
        let mut ids: Vec<u64> = self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == object_type)
            .map(|entry| entry.key().1)
            .collect();
        ids.sort_unstable();

        Ok(ids
            .into_iter()
            .skip(offset as usize)
            .take(limit)
            .collect())
    }

    async fn count_objects(&self, object_type: ObjectType) -> ContentResult<u64> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == object_type)
            .count() as u64)
    }

    async fn object_exists(&self, object_id: u64, object_type: ObjectType) -> ContentResult<bool> {
        Ok(self.objects.contains_key(&(object_type, object_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentStatus;
    use chrono::Utc;
    use std::collections::HashMap;

    fn post(id: u64) -> SourceObject {
        SourceObject {
            id,
            object_type: ObjectType::Post,
            title: format!("Post {id}"),
            content: "body".into(),
            excerpt: String::new(),
            author_id: 1,
            author_name: "alice".into(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
            status: ContentStatus::Publish,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_list_objects_is_sorted_and_paged() {
        let store = InMemoryContentStore::new();
        for id in [5, 1, 9, 3] {
            store.put(post(id));
        }

        assert_eq!(
            store.list_objects(ObjectType::Post, 0, 10).await.unwrap(),
            vec![1, 3, 5, 9]
        );
        assert_eq!(
            store.list_objects(ObjectType::Post, 1, 2).await.unwrap(),
            vec![3, 5]
        );
        assert_eq!(store.count_objects(ObjectType::Post).await.unwrap(), 4);
        assert_eq!(store.count_objects(ObjectType::Comment).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_and_delete() {
        let store = InMemoryContentStore::new();
        store.put(post(1));

        assert!(store
            .load_object(1, ObjectType::Post)
            .await
            .unwrap()
            .is_some());
        assert!(store.object_exists(1, ObjectType::Post).await.unwrap());

        store.delete(1, ObjectType::Post);
        assert!(store
            .load_object(1, ObjectType::Post)
            .await
            .unwrap()
            .is_none());
    }
}

use crate::analytics::AnalyticsError;
use crate::models::{PopularQuery, SearchEvent};
use uuid::Uuid;

/// Sled-backed persistence for search events and popular-query counters.
/// Writes are write-through from the in-memory engine; both trees are
/// reloaded at open.
pub struct AnalyticsPersistence {
    events: sled::Tree,
    popular: sled::Tree,
}

impl AnalyticsPersistence {
    pub fn new(db: sled::Db) -> Result<Self, AnalyticsError> {
        let events = db.open_tree("search_events").map_err(|e| {
            AnalyticsError::Storage(format!("Failed to open search_events tree: {e}"))
        })?;
        let popular = db.open_tree("popular_queries").map_err(|e| {
            AnalyticsError::Storage(format!("Failed to open popular_queries tree: {e}"))
        })?;

        Ok(Self { events, popular })
    }

    pub fn save_event(&self, event: &SearchEvent) -> Result<(), AnalyticsError> {
        let value = bincode::serialize(event)
            .map_err(|e| AnalyticsError::Storage(format!("Failed to serialize event: {e}")))?;
        self.events
            .insert(event.id.as_bytes(), value)
            .map_err(|e| AnalyticsError::Storage(format!("Failed to save event: {e}")))?;
        Ok(())
    }

    pub fn delete_event(&self, id: &Uuid) -> Result<(), AnalyticsError> {
        self.events
            .remove(id.as_bytes())
            .map_err(|e| AnalyticsError::Storage(format!("Failed to delete event: {e}")))?;
        Ok(())
    }

    pub fn save_popular(&self, normalized: &str, entry: &PopularQuery) -> Result<(), AnalyticsError> {
        let value = bincode::serialize(entry)
            .map_err(|e| AnalyticsError::Storage(format!("Failed to serialize counter: {e}")))?;
        self.popular
            .insert(normalized.as_bytes(), value)
            .map_err(|e| AnalyticsError::Storage(format!("Failed to save counter: {e}")))?;
        Ok(())
    }

    pub fn delete_popular(&self, normalized: &str) -> Result<(), AnalyticsError> {
        self.popular
            .remove(normalized.as_bytes())
            .map_err(|e| AnalyticsError::Storage(format!("Failed to delete counter: {e}")))?;
        Ok(())
    }

    /// Load every persisted event; individually corrupt rows are logged and
    /// skipped so one bad row cannot take recorded history down with it.
    pub fn load_events(&self) -> Result<Vec<SearchEvent>, AnalyticsError> {
        let mut events = Vec::new();
        for item in self.events.iter() {
            let (key, value) = item
                .map_err(|e| AnalyticsError::Storage(format!("Failed to read event: {e}")))?;
            match bincode::deserialize::<SearchEvent>(&value) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "Skipping corrupt analytics row"
                    );
                }
            }
        }
        Ok(events)
    }

    pub fn load_popular(&self) -> Result<Vec<(String, PopularQuery)>, AnalyticsError> {
        let mut counters = Vec::new();
        for item in self.popular.iter() {
            let (key, value) = item
                .map_err(|e| AnalyticsError::Storage(format!("Failed to read counter: {e}")))?;
            let normalized = String::from_utf8_lossy(&key).to_string();
            match bincode::deserialize::<PopularQuery>(&value) {
                Ok(entry) => counters.push((normalized, entry)),
                Err(e) => {
                    tracing::warn!(key = %normalized, error = %e, "Skipping corrupt counter row");
                }
            }
        }
        Ok(counters)
    }

    pub fn clear(&self) -> Result<(), AnalyticsError> {
        self.events
            .clear()
            .map_err(|e| AnalyticsError::Storage(format!("Failed to clear events: {e}")))?;
        self.popular
            .clear()
            .map_err(|e| AnalyticsError::Storage(format!("Failed to clear counters: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_db;
    use chrono::Utc;
    use tempfile::TempDir;

    fn event(query: &str) -> SearchEvent {
        SearchEvent {
            id: Uuid::new_v4(),
            user_id: Some(7),
            query: query.to_string(),
            result_count: 3,
            created_at: Utc::now(),
            ip: None,
            user_agent: None,
            click: None,
        }
    }

    #[test]
    fn test_event_roundtrip() {
        let dir = TempDir::new().unwrap();
        let db = open_db(dir.path()).unwrap();
        let persist = AnalyticsPersistence::new(db).unwrap();

        let e = event("rust async");
        persist.save_event(&e).unwrap();

        let loaded = persist.load_events().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].query, "rust async");

        persist.delete_event(&e.id).unwrap();
        assert!(persist.load_events().unwrap().is_empty());
    }

    #[test]
    fn test_popular_roundtrip() {
        let dir = TempDir::new().unwrap();
        let db = open_db(dir.path()).unwrap();
        let persist = AnalyticsPersistence::new(db).unwrap();

        let entry = PopularQuery {
            query: "Rust Async".into(),
            count: 4,
            last_searched_at: Utc::now(),
        };
        persist.save_popular("rust async", &entry).unwrap();

        let loaded = persist.load_popular().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "rust async");
        assert_eq!(loaded[0].1.count, 4);
    }
}

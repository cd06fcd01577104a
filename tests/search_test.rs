//! End-to-end search tests: content store -> indexer -> query engine

use chrono::{Duration, Utc};
use content_search::config::{IndexingConfig, QueryConfig};
use content_search::content::InMemoryContentStore;
use content_search::indexer::Indexer;
use content_search::models::{ContentStatus, ObjectType, SourceObject};
use content_search::search::{OrderBy, QueryEngine, SearchRequest, TypeFilter};
use content_search::store::{open_db, IndexStore};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn post(id: u64, title: &str, content: &str) -> SourceObject {
    let now = Utc::now();
    SourceObject {
        id,
        object_type: ObjectType::Post,
        title: title.to_string(),
        content: content.to_string(),
        excerpt: String::new(),
        author_id: 1,
        author_name: "alice".to_string(),
        created_at: now,
        modified_at: now,
        status: ContentStatus::Publish,
        metadata: HashMap::new(),
    }
}

fn comment(id: u64, content: &str) -> SourceObject {
    SourceObject {
        status: ContentStatus::Approved,
        object_type: ObjectType::Comment,
        ..post(id, "", content)
    }
}

async fn indexed_engine(objects: Vec<SourceObject>) -> (QueryEngine, Arc<IndexStore>) {
    let store = Arc::new(IndexStore::in_memory(2));
    let content = Arc::new(InMemoryContentStore::new());
    let indexer = Indexer::new(store.clone(), content.clone(), IndexingConfig::default());

    for object in objects {
        let (id, ty) = (object.id, object.object_type);
        content.put(object);
        indexer.upsert(id, ty).await.unwrap();
    }

    (QueryEngine::new(store.clone(), QueryConfig::default()), store)
}

#[tokio::test]
async fn test_title_match_outranks_body_match() {
    let (engine, _store) = indexed_engine(vec![
        post(1, "Cooking at home", "I have been learning rust in my spare time"),
        post(2, "Rust ownership explained", "A walkthrough of borrows and moves"),
    ])
    .await;

    let response = engine.search(&SearchRequest::new("rust")).unwrap();
    assert_eq!(response.total, 2);
    assert_eq!(response.results[0].object_id, 2);
}

#[tokio::test]
async fn test_type_filter_keeps_relative_order() {
    let (engine, _store) = indexed_engine(vec![
        post(1, "Rust tips", "short"),
        comment(10, "great rust article"),
        post(2, "Gardening", "nothing relevant"),
    ])
    .await;

    let all = engine.search(&SearchRequest::new("rust")).unwrap();
    assert_eq!(all.total, 2);

    let comments = engine
        .search(&SearchRequest::new("rust").with_type(TypeFilter::Comment))
        .unwrap();
    assert_eq!(comments.total, 1);
    assert_eq!(comments.results[0].object_type, ObjectType::Comment);
}

#[tokio::test]
async fn test_pagination_totals_are_query_wide() {
    let objects: Vec<SourceObject> = (1..=25)
        .map(|id| post(id, &format!("Rust note {id}"), "body"))
        .collect();
    let (engine, _store) = indexed_engine(objects).await;

    let page3 = engine
        .search(&SearchRequest::new("rust").with_page(3, 10))
        .unwrap();
    assert_eq!(page3.total, 25);
    assert_eq!(page3.total_pages, 3);
    assert_eq!(page3.results.len(), 5);

    let beyond = engine
        .search(&SearchRequest::new("rust").with_page(4, 10))
        .unwrap();
    assert_eq!(beyond.total, 25);
    assert!(beyond.results.is_empty());
}

#[tokio::test]
async fn test_order_by_date() {
    let mut older = post(1, "Rust then", "body");
    older.modified_at = Utc::now() - Duration::days(30);
    let newer = post(2, "Rust now", "body");

    let (engine, _store) = indexed_engine(vec![older, newer]).await;

    let response = engine
        .search(&SearchRequest::new("rust").with_order(OrderBy::Date))
        .unwrap();
    assert_eq!(response.results[0].object_id, 2);
    assert_eq!(response.results[1].object_id, 1);
}

#[tokio::test]
async fn test_order_by_views() {
    let mut quiet = post(1, "Rust quiet", "body");
    quiet.metadata.insert("views".to_string(), "3".to_string());
    let mut viral = post(2, "Rust viral", "body");
    viral.metadata.insert("views".to_string(), "9000".to_string());

    let (engine, _store) = indexed_engine(vec![quiet, viral]).await;

    let response = engine
        .search(&SearchRequest::new("rust").with_order(OrderBy::Views))
        .unwrap();
    assert_eq!(response.results[0].object_id, 2);
}

#[tokio::test]
async fn test_fuzzy_fallback_catches_typos() {
    let (engine, _store) =
        indexed_engine(vec![post(1, "Python tutorial", "an introduction")]).await;

    let response = engine.search(&SearchRequest::new("pyhton")).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].object_id, 1);
}

#[tokio::test]
async fn test_unindexed_draft_is_invisible() {
    let mut draft = post(1, "Rust secrets", "unpublished");
    draft.status = ContentStatus::Draft;
    let (engine, _store) = indexed_engine(vec![draft, post(2, "Rust public", "x")]).await;

    let response = engine.search(&SearchRequest::new("rust")).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].object_id, 2);
}

#[tokio::test]
async fn test_search_survives_restart_with_sled() {
    let dir = TempDir::new().unwrap();

    {
        let db = open_db(dir.path()).unwrap();
        let store = Arc::new(IndexStore::persistent(db, 2).unwrap());
        let content = Arc::new(InMemoryContentStore::new());
        let indexer = Indexer::new(store.clone(), content.clone(), IndexingConfig::default());
        content.put(post(1, "Rust after restart", "persistence check"));
        indexer.upsert(1, ObjectType::Post).await.unwrap();
        store.compact().unwrap();
    }

    let db = open_db(dir.path()).unwrap();
    let store = Arc::new(IndexStore::persistent(db, 2).unwrap());
    let engine = QueryEngine::new(store, QueryConfig::default());

    let response = engine.search(&SearchRequest::new("restart")).unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].title, "Rust after restart");
}

#[tokio::test]
async fn test_synonym_expansion_broadens_results() {
    let store = Arc::new(IndexStore::in_memory(2));
    let content = Arc::new(InMemoryContentStore::new());
    let indexer = Indexer::new(store.clone(), content.clone(), IndexingConfig::default());
    for object in [post(1, "My weblog setup", "x"), post(2, "Blog writing", "x")] {
        let (id, ty) = (object.id, object.object_type);
        content.put(object);
        indexer.upsert(id, ty).await.unwrap();
    }

    let mut config = QueryConfig::default();
    config
        .synonyms
        .insert("blog".to_string(), vec!["weblog".to_string()]);
    let engine = QueryEngine::new(store, config);

    let response = engine.search(&SearchRequest::new("blog")).unwrap();
    assert_eq!(response.total, 2);
}

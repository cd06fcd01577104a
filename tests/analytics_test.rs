//! Analytics engine tests: recording, reporting, persistence across restarts

use content_search::analytics::{AnalyticsEngine, SearchRecord};
use content_search::config::AnalyticsConfig;
use content_search::models::ObjectType;
use content_search::store::open_db;
use tempfile::TempDir;

fn record(query: &str, user_id: Option<u64>, result_count: u64) -> SearchRecord {
    SearchRecord {
        query: query.to_string(),
        user_id,
        result_count,
        ip: Some("10.0.0.1".to_string()),
        user_agent: Some("integration-test".to_string()),
    }
}

#[test]
fn test_history_survives_restart() {
    let dir = TempDir::new().unwrap();

    let event_id = {
        let db = open_db(dir.path()).unwrap();
        let analytics = AnalyticsEngine::persistent(db, AnalyticsConfig::default()).unwrap();
        let id = analytics.record_search(record("rust async", Some(1), 5));
        analytics.record_click(id, 42, ObjectType::Post, 2);
        analytics.record_search(record("rust async", Some(2), 5));
        id
    };

    let db = open_db(dir.path()).unwrap();
    let analytics = AnalyticsEngine::persistent(db, AnalyticsConfig::default()).unwrap();

    assert_eq!(analytics.event_count(), 2);
    let popular = analytics.popular_queries();
    assert_eq!(popular[0].count, 2);

    let stats = analytics.stats(7).unwrap();
    assert_eq!(stats.total_searches, 2);
    assert_eq!(stats.popular_content[0].result_id, 42);

    // the persisted click stays attached to its event
    assert!(!analytics.record_click(event_id, 42, ObjectType::Post, 1));
}

#[test]
fn test_purge_clears_persisted_history() {
    let dir = TempDir::new().unwrap();

    {
        let db = open_db(dir.path()).unwrap();
        let analytics = AnalyticsEngine::persistent(db, AnalyticsConfig::default()).unwrap();
        analytics.record_search(record("rust", Some(1), 5));
        analytics.record_search(record("sled", Some(1), 1));
        assert_eq!(analytics.purge(None), 2);
    }

    let db = open_db(dir.path()).unwrap();
    let analytics = AnalyticsEngine::persistent(db, AnalyticsConfig::default()).unwrap();
    assert_eq!(analytics.event_count(), 0);
    assert!(analytics.popular_queries().is_empty());
}

#[test]
fn test_quality_metrics_end_to_end() {
    let analytics = AnalyticsEngine::in_memory(AnalyticsConfig::default());

    // user 1: one session, refined once, one click at position 3
    analytics.record_search(record("rust webserver", Some(1), 0));
    let id = analytics.record_search(record("rust axum server", Some(1), 6));
    analytics.record_click(id, 11, ObjectType::Post, 3);

    // user 2: single-query session, no click
    analytics.record_search(record("gardening", Some(2), 9));

    let metrics = analytics.quality_metrics(30).unwrap();
    assert!((metrics.click_through_rate - 100.0 / 3.0).abs() < 1e-9);
    assert!((metrics.zero_result_rate - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(metrics.avg_click_position, 3.0);
    assert_eq!(metrics.refinement_rate, 50.0);
}

#[test]
fn test_top_lists_respect_configured_cap() {
    let config = AnalyticsConfig {
        top_limit: 3,
        ..Default::default()
    };
    let analytics = AnalyticsEngine::in_memory(config);

    for i in 0..6 {
        for _ in 0..=i {
            analytics.record_search(record(&format!("query {i}"), Some(1), 2));
        }
    }

    let stats = analytics.stats(7).unwrap();
    assert_eq!(stats.top_queries.len(), 3);
    assert_eq!(stats.top_queries[0].query, "query 5");
    assert_eq!(stats.top_queries[0].count, 6);
}

#[test]
fn test_anonymous_searches_group_by_ip() {
    let analytics = AnalyticsEngine::in_memory(AnalyticsConfig::default());

    // two anonymous searches from one address form one refined session
    analytics.record_search(record("rust", None, 3));
    analytics.record_search(record("rust patterns", None, 3));

    let metrics = analytics.quality_metrics(7).unwrap();
    assert_eq!(metrics.refinement_rate, 100.0);

    let stats = analytics.stats(7).unwrap();
    assert_eq!(stats.unique_users, 0);
}

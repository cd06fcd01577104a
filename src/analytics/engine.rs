use crate::analytics::metrics::{
    percentage, ContentClicks, DayCount, QualityMetrics, QueryCount, SearchStats,
};
use crate::analytics::persist::AnalyticsPersistence;
use crate::analytics::{AnalyticsError, AnalyticsResult};
use crate::config::AnalyticsConfig;
use crate::models::{ClickOutcome, ObjectType, PopularQuery, SearchEvent};
use crate::text::normalize;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// What the caller knows about a search at record time
#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub query: String,
    pub user_id: Option<u64>,
    pub result_count: u64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Records search and click events and reports aggregate statistics.
///
/// Recording sits on the search hot path, so it never fails outward:
/// events always land in memory, and persistence failures are logged and
/// absorbed. Reporting reads are served entirely from memory.
pub struct AnalyticsEngine {
    events: DashMap<Uuid, SearchEvent>,
    popular: DashMap<String, PopularQuery>,
    persist: Option<AnalyticsPersistence>,
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn in_memory(config: AnalyticsConfig) -> Self {
        Self {
            events: DashMap::new(),
            popular: DashMap::new(),
            persist: None,
            config,
        }
    }

    /// Open with sled persistence, reloading recorded history
    pub fn persistent(db: sled::Db, config: AnalyticsConfig) -> AnalyticsResult<Self> {
        let persist = AnalyticsPersistence::new(db)?;

        let events = DashMap::new();
        for event in persist.load_events()? {
            events.insert(event.id, event);
        }
        let popular = DashMap::new();
        for (normalized, entry) in persist.load_popular()? {
            popular.insert(normalized, entry);
        }

        tracing::info!(events = events.len(), queries = popular.len(), "Analytics history loaded");
        Ok(Self {
            events,
            popular,
            persist: Some(persist),
            config,
        })
    }

    /// Record an executed search and return the event id clients use to
    /// report a subsequent click
    pub fn record_search(&self, record: SearchRecord) -> Uuid {
        let event = SearchEvent {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            query: record.query,
            result_count: record.result_count,
            created_at: Utc::now(),
            ip: record.ip,
            user_agent: record.user_agent,
            click: None,
        };

        let normalized = normalize(&event.query);
        if !normalized.is_empty() {
            let mut entry = self
                .popular
                .entry(normalized.clone())
                .or_insert_with(|| PopularQuery {
                    query: event.query.clone(),
                    count: 0,
                    last_searched_at: event.created_at,
                });
            entry.count += 1;
            entry.last_searched_at = event.created_at;

            if let Some(persist) = &self.persist {
                if let Err(e) = persist.save_popular(&normalized, &entry) {
                    tracing::warn!(error = %e, "Failed to persist query counter");
                }
            }
        }

        if let Some(persist) = &self.persist {
            if let Err(e) = persist.save_event(&event) {
                tracing::warn!(event_id = %event.id, error = %e, "Failed to persist search event");
            }
        }

        let id = event.id;
        self.events.insert(id, event);
        id
    }

    /// Attach a click to a recorded search. Only the first click for an
    /// event is kept; returns false for unknown events and repeat clicks.
    pub fn record_click(
        &self,
        event_id: Uuid,
        result_id: u64,
        result_type: ObjectType,
        position: u32,
    ) -> bool {
        let Some(mut event) = self.events.get_mut(&event_id) else {
            return false;
        };
        if event.click.is_some() {
            return false;
        }

        event.click = Some(ClickOutcome {
            result_id,
            result_type,
            position,
            clicked_at: Utc::now(),
        });

        if let Some(persist) = &self.persist {
            if let Err(e) = persist.save_event(&event) {
                tracing::warn!(event_id = %event_id, error = %e, "Failed to persist click");
            }
        }
        true
    }

    /// Aggregate statistics over the trailing `days` window
    pub fn stats(&self, days: u32) -> AnalyticsResult<SearchStats> {
        let start = self.window_start(days)?;
        let events = self.events_since(start);

        let total_searches = events.len() as u64;
        let mut queries: HashMap<String, (String, u64)> = HashMap::new();
        let mut zero_queries: HashMap<String, (String, u64)> = HashMap::new();
        let mut users: HashSet<u64> = HashSet::new();
        let mut days_map: BTreeMap<chrono::NaiveDate, u64> = BTreeMap::new();
        let mut clicks: HashMap<(u64, ObjectType), u64> = HashMap::new();
        let mut result_sum = 0u64;

        for event in &events {
            let normalized = normalize(&event.query);
            let slot = queries
                .entry(normalized.clone())
                .or_insert_with(|| (event.query.clone(), 0));
            slot.1 += 1;
            if event.result_count == 0 {
                let slot = zero_queries
                    .entry(normalized)
                    .or_insert_with(|| (event.query.clone(), 0));
                slot.1 += 1;
            }
            if let Some(uid) = event.user_id {
                users.insert(uid);
            }
            *days_map.entry(event.created_at.date_naive()).or_default() += 1;
            if let Some(click) = &event.click {
                *clicks.entry((click.result_id, click.result_type)).or_default() += 1;
            }
            result_sum += event.result_count;
        }

        let unique_queries = queries.len() as u64;
        let avg_results_per_search = if total_searches == 0 {
            0.0
        } else {
            result_sum as f64 / total_searches as f64
        };

        Ok(SearchStats {
            window_days: days,
            total_searches,
            unique_queries,
            unique_users: users.len() as u64,
            avg_results_per_search,
            top_queries: self.rank_queries(queries),
            zero_result_queries: self.rank_queries(zero_queries),
            trend_by_day: days_map
                .into_iter()
                .map(|(date, searches)| DayCount { date, searches })
                .collect(),
            popular_content: self.rank_clicks(clicks),
        })
    }

    /// Quality metrics over the trailing `days` window
    pub fn quality_metrics(&self, days: u32) -> AnalyticsResult<QualityMetrics> {
        let start = self.window_start(days)?;
        let events = self.events_since(start);

        let total = events.len() as u64;
        let clicked = events.iter().filter(|e| e.click.is_some()).count() as u64;
        let zero = events.iter().filter(|e| e.result_count == 0).count() as u64;

        let avg_click_position = if clicked == 0 {
            0.0
        } else {
            let sum: u64 = events
                .iter()
                .filter_map(|e| e.click.as_ref())
                .map(|c| c.position as u64)
                .sum();
            sum as f64 / clicked as f64
        };

        let (sessions, refined) = self.count_sessions(&events);

        Ok(QualityMetrics {
            window_days: days,
            click_through_rate: percentage(clicked, total),
            zero_result_rate: percentage(zero, total),
            avg_click_position,
            refinement_rate: percentage(refined, sessions),
        })
    }

    /// Drop recorded history. `None` clears everything; `Some(days)` keeps
    /// the trailing window and drops query counters last touched before it.
    /// Returns the number of events removed.
    pub fn purge(&self, older_than_days: Option<u32>) -> u64 {
        match older_than_days {
            None => {
                let removed = self.events.len() as u64;
                self.events.clear();
                self.popular.clear();
                if let Some(persist) = &self.persist {
                    if let Err(e) = persist.clear() {
                        tracing::warn!(error = %e, "Failed to clear persisted analytics");
                    }
                }
                removed
            }
            Some(days) => {
                let cutoff = Utc::now() - Duration::days(i64::from(days));
                let mut removed = 0;
                let stale: Vec<Uuid> = self
                    .events
                    .iter()
                    .filter(|e| e.created_at < cutoff)
                    .map(|e| e.id)
                    .collect();
                for id in stale {
                    if self.events.remove(&id).is_some() {
                        removed += 1;
                        if let Some(persist) = &self.persist {
                            if let Err(e) = persist.delete_event(&id) {
                                tracing::warn!(event_id = %id, error = %e, "Failed to purge event");
                            }
                        }
                    }
                }

                let stale_queries: Vec<String> = self
                    .popular
                    .iter()
                    .filter(|entry| entry.last_searched_at < cutoff)
                    .map(|entry| entry.key().clone())
                    .collect();
                for key in stale_queries {
                    self.popular.remove(&key);
                    if let Some(persist) = &self.persist {
                        if let Err(e) = persist.delete_popular(&key) {
                            tracing::warn!(error = %e, "Failed to purge query counter");
                        }
                    }
                }

                removed
            }
        }
    }

    /// Distinct normalized queries by one user, most recent first
    pub fn user_history(&self, user_id: u64) -> Vec<String> {
        let mut events: Vec<(DateTime<Utc>, String)> = self
            .events
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .map(|e| (e.created_at, normalize(&e.query)))
            .filter(|(_, q)| !q.is_empty())
            .collect();
        events.sort_by(|a, b| b.0.cmp(&a.0));

        let mut seen = HashSet::new();
        events
            .into_iter()
            .filter_map(|(_, q)| seen.insert(q.clone()).then_some(q))
            .collect()
    }

    /// All query counters, count descending; ties broken by recency then
    /// query text so the order is stable
    pub fn popular_queries(&self) -> Vec<PopularQuery> {
        let mut queries: Vec<PopularQuery> =
            self.popular.iter().map(|entry| entry.value().clone()).collect();
        queries.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_searched_at.cmp(&a.last_searched_at))
                .then_with(|| a.query.cmp(&b.query))
        });
        queries
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn window_start(&self, days: u32) -> AnalyticsResult<DateTime<Utc>> {
        if days == 0 {
            return Err(AnalyticsError::InvalidWindow(
                "window must cover at least one day".to_string(),
            ));
        }
        Ok(Utc::now() - Duration::days(i64::from(days)))
    }

    fn events_since(&self, start: DateTime<Utc>) -> Vec<SearchEvent> {
        let mut events: Vec<SearchEvent> = self
            .events
            .iter()
            .filter(|e| e.created_at >= start)
            .map(|e| e.value().clone())
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        events
    }

    fn rank_queries(&self, grouped: HashMap<String, (String, u64)>) -> Vec<QueryCount> {
        let mut ranked: Vec<QueryCount> = grouped
            .into_iter()
            .map(|(normalized, (_, count))| QueryCount {
                query: normalized,
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        ranked.truncate(self.config.top_limit);
        ranked
    }

    fn rank_clicks(&self, grouped: HashMap<(u64, ObjectType), u64>) -> Vec<ContentClicks> {
        let mut ranked: Vec<ContentClicks> = grouped
            .into_iter()
            .map(|((result_id, result_type), clicks)| ContentClicks {
                result_id,
                result_type,
                clicks,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.clicks
                .cmp(&a.clicks)
                .then_with(|| a.result_id.cmp(&b.result_id))
                .then_with(|| a.result_type.cmp(&b.result_type))
        });
        ranked.truncate(self.config.top_limit);
        ranked
    }

    /// Sessionize events (sorted ascending) per actor and count how many
    /// sessions contain a query reformulation. An identified user is one
    /// actor across IPs; anonymous traffic groups by IP.
    fn count_sessions(&self, events: &[SearchEvent]) -> (u64, u64) {
        let gap = Duration::seconds(self.config.session_gap_secs as i64);
        let mut by_actor: HashMap<String, Vec<&SearchEvent>> = HashMap::new();
        for event in events {
            let actor = match (event.user_id, &event.ip) {
                (Some(uid), _) => format!("u:{uid}"),
                (None, Some(ip)) => format!("ip:{ip}"),
                (None, None) => "anonymous".to_string(),
            };
            by_actor.entry(actor).or_default().push(event);
        }

        let mut sessions = 0u64;
        let mut refined = 0u64;
        for stream in by_actor.values() {
            let mut session: Vec<&SearchEvent> = Vec::new();
            let mut close_session = |session: &mut Vec<&SearchEvent>| {
                if session.is_empty() {
                    return;
                }
                sessions += 1;
                let reworded = session.windows(2).any(|pair| {
                    normalize(&pair[0].query) != normalize(&pair[1].query)
                });
                if reworded {
                    refined += 1;
                }
                session.clear();
            };

            for event in stream {
                if let Some(last) = session.last() {
                    if event.created_at - last.created_at > gap {
                        close_session(&mut session);
                    }
                }
                session.push(event);
            }
            close_session(&mut session);
        }

        (sessions, refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::in_memory(AnalyticsConfig::default())
    }

    fn record(query: &str, user_id: Option<u64>, result_count: u64) -> SearchRecord {
        SearchRecord {
            query: query.to_string(),
            user_id,
            result_count,
            ip: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_click_through_rate_exact() {
        let analytics = engine();
        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(analytics.record_search(record("rust", Some(i), 5)));
        }
        assert!(analytics.record_click(ids[0], 10, ObjectType::Post, 1));

        let metrics = analytics.quality_metrics(7).unwrap();
        assert_eq!(metrics.click_through_rate, 25.0);
        assert_eq!(metrics.avg_click_position, 1.0);
    }

    #[test]
    fn test_zero_result_rate() {
        let analytics = engine();
        for i in 0..8 {
            analytics.record_search(record("rust", Some(i), 3));
        }
        analytics.record_search(record("xyzzy", Some(100), 0));
        analytics.record_search(record("qwerty", Some(101), 0));

        let metrics = analytics.quality_metrics(7).unwrap();
        assert_eq!(metrics.zero_result_rate, 20.0);
    }

    #[test]
    fn test_first_click_wins() {
        let analytics = engine();
        let id = analytics.record_search(record("rust", Some(1), 5));

        assert!(analytics.record_click(id, 10, ObjectType::Post, 2));
        assert!(!analytics.record_click(id, 11, ObjectType::Post, 1));

        let event = analytics.events.get(&id).unwrap();
        assert_eq!(event.click.as_ref().unwrap().result_id, 10);
    }

    #[test]
    fn test_click_on_unknown_event() {
        let analytics = engine();
        assert!(!analytics.record_click(Uuid::new_v4(), 1, ObjectType::Post, 1));
    }

    #[test]
    fn test_refinement_rate_counts_reworded_sessions() {
        let analytics = engine();
        // user 1 rewords within one session
        analytics.record_search(record("rust async", Some(1), 0));
        analytics.record_search(record("rust tokio", Some(1), 4));
        // user 2 repeats the same query
        analytics.record_search(record("sled", Some(2), 2));
        analytics.record_search(record("sled", Some(2), 2));

        let metrics = analytics.quality_metrics(7).unwrap();
        assert_eq!(metrics.refinement_rate, 50.0);
    }

    #[test]
    fn test_stats_aggregates() {
        let analytics = engine();
        analytics.record_search(record("rust", Some(1), 5));
        analytics.record_search(record("Rust", Some(2), 5));
        analytics.record_search(record("tokio", Some(1), 0));

        let stats = analytics.stats(7).unwrap();
        assert_eq!(stats.total_searches, 3);
        assert_eq!(stats.unique_queries, 2);
        assert_eq!(stats.unique_users, 2);
        assert_eq!(stats.top_queries[0].query, "rust");
        assert_eq!(stats.top_queries[0].count, 2);
        assert_eq!(stats.zero_result_queries.len(), 1);
        assert_eq!(stats.trend_by_day.len(), 1);
        assert_eq!(stats.trend_by_day[0].searches, 3);
    }

    #[test]
    fn test_stats_rejects_zero_window() {
        let analytics = engine();
        assert!(matches!(
            analytics.stats(0),
            Err(AnalyticsError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_popular_content_ranked_by_clicks() {
        let analytics = engine();
        for _ in 0..3 {
            let id = analytics.record_search(record("rust", Some(1), 5));
            analytics.record_click(id, 42, ObjectType::Post, 1);
        }
        let id = analytics.record_search(record("rust", Some(1), 5));
        analytics.record_click(id, 7, ObjectType::Comment, 3);

        let stats = analytics.stats(7).unwrap();
        assert_eq!(stats.popular_content[0].result_id, 42);
        assert_eq!(stats.popular_content[0].clicks, 3);
        assert_eq!(stats.popular_content[1].result_id, 7);
    }

    #[test]
    fn test_purge_all() {
        let analytics = engine();
        analytics.record_search(record("rust", Some(1), 5));
        analytics.record_search(record("tokio", Some(1), 2));

        assert_eq!(analytics.purge(None), 2);
        assert_eq!(analytics.event_count(), 0);
        assert!(analytics.popular_queries().is_empty());
    }

    #[test]
    fn test_purge_keeps_recent_window() {
        let analytics = engine();
        analytics.record_search(record("rust", Some(1), 5));

        // everything recorded just now falls inside any non-zero window
        assert_eq!(analytics.purge(Some(30)), 0);
        assert_eq!(analytics.event_count(), 1);
    }

    #[test]
    fn test_user_history_distinct_recent_first() {
        let analytics = engine();
        analytics.record_search(record("rust async", Some(1), 5));
        analytics.record_search(record("sled", Some(1), 2));
        analytics.record_search(record("Rust Async", Some(1), 5));
        analytics.record_search(record("other user", Some(2), 1));

        let history = analytics.user_history(1);
        assert_eq!(history, vec!["rust async", "sled"]);
    }
}

use crate::models::ObjectType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate statistics over a reporting window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Number of days covered by the window
    pub window_days: u32,
    pub total_searches: u64,
    /// Distinct normalized query strings
    pub unique_queries: u64,
    /// Distinct identified users (anonymous searches excluded)
    pub unique_users: u64,
    pub avg_results_per_search: f64,
    /// Most frequent queries, count descending
    pub top_queries: Vec<QueryCount>,
    /// Most frequent queries that returned nothing
    pub zero_result_queries: Vec<QueryCount>,
    /// One bucket per calendar day with activity, ascending
    pub trend_by_day: Vec<DayCount>,
    /// Most clicked results, click count descending
    pub popular_content: Vec<ContentClicks>,
}

/// A query with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub count: u64,
}

/// Search volume for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub searches: u64,
}

/// Click volume for one indexed result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentClicks {
    pub result_id: u64,
    pub result_type: ObjectType,
    pub clicks: u64,
}

/// Search experience quality over a reporting window. Rates are percentages
/// in [0, 100]; `avg_click_position` is a plain mean of 1-based positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub window_days: u32,
    pub click_through_rate: f64,
    pub zero_result_rate: f64,
    /// 0.0 when no clicks were recorded in the window
    pub avg_click_position: f64,
    /// Share of sessions where the user reworded their query
    pub refinement_rate: f64,
}

/// Percentage of `part` over `whole`; 0.0 for an empty denominator
pub(super) fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(0, 10), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
    }
}

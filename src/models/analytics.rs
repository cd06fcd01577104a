use crate::models::ObjectType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded search, appended on every completed query (including
/// zero-result searches). The click outcome is attached later, at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEvent {
    pub id: Uuid,
    pub user_id: Option<u64>,
    pub query: String,
    pub result_count: u64,
    pub created_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    /// First click wins; a second click for the same event is a no-op
    pub click: Option<ClickOutcome>,
}

/// Click follow-up correlated to an originating search event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickOutcome {
    pub result_id: u64,
    pub result_type: ObjectType,
    /// 1-based rank of the clicked result on the served page
    pub position: u32,
    pub clicked_at: DateTime<Utc>,
}

/// Increment-or-insert aggregate keyed by normalized query text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularQuery {
    pub query: String,
    pub count: u64,
    pub last_searched_at: DateTime<Utc>,
}

/// Where an autocomplete candidate came from, in descending priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuggestionSource {
    /// The requesting user's own prior queries
    History,
    /// Globally popular queries
    Popular,
    /// Content titles
    Title,
    /// Content categories
    Category,
    /// Content tags
    Tag,
}

impl SuggestionSource {
    /// Lower rank merges first and survives deduplication
    pub fn priority(&self) -> u8 {
        match self {
            SuggestionSource::History => 0,
            SuggestionSource::Popular => 1,
            SuggestionSource::Title => 2,
            SuggestionSource::Category => 3,
            SuggestionSource::Tag => 4,
        }
    }
}

/// An autocomplete candidate (ephemeral, never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub source: SuggestionSource,
}

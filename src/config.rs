use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Index storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Indexer configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Query engine configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Suggestion service configuration
    #[serde(default)]
    pub suggest: SuggestConfig,

    /// Analytics engine configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl Config {
    /// Load configuration from embedded defaults, an optional file, and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/local.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: CONTENT_SEARCH)
            .add_source(
                config::Environment::with_prefix("CONTENT_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Index store backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-memory only; contents are lost on restart (tests, demos)
    #[default]
    Memory,
    /// Sled-backed persistence, reloaded on startup
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path for the embedded database (sled backend)
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Number of source objects fetched and indexed per rebuild batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush persisted writes after every upsert (vs. on compact only)
    #[serde(default = "default_true")]
    pub realtime_persist: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            realtime_persist: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Tokens shorter than this are discarded from queries and documents
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,

    /// Default page size when the request leaves per_page unset
    #[serde(default = "default_per_page")]
    pub default_per_page: usize,

    /// Upper bound on per_page; larger requests are rejected
    #[serde(default = "default_max_per_page")]
    pub max_per_page: usize,

    /// Field weight applied to title matches
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,

    /// Field weight applied to body/content matches
    #[serde(default = "default_content_weight")]
    pub content_weight: f64,

    /// Field weight applied to excerpt matches
    #[serde(default = "default_excerpt_weight")]
    pub excerpt_weight: f64,

    /// Recency bonus scale used under relevance ordering
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    /// View-count bonus scale for posts under relevance ordering
    #[serde(default = "default_views_weight")]
    pub views_weight: f64,

    /// Enable fuzzy fallback for tokens with no exact match
    #[serde(default = "default_true")]
    pub fuzzy_enabled: bool,

    /// Maximum edit distance for fuzzy matching (reduced to 1 for short tokens)
    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: u32,

    /// Score multiplier applied to fuzzy (non-exact) matches
    #[serde(default = "default_fuzzy_penalty")]
    pub fuzzy_penalty: f64,

    /// Enable synonym expansion
    #[serde(default = "default_true")]
    pub synonyms_enabled: bool,

    /// Synonym dictionary: token -> equivalent terms (expanded as a union)
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            min_token_len: default_min_token_len(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            title_weight: default_title_weight(),
            content_weight: default_content_weight(),
            excerpt_weight: default_excerpt_weight(),
            recency_weight: default_recency_weight(),
            views_weight: default_views_weight(),
            fuzzy_enabled: true,
            max_edit_distance: default_max_edit_distance(),
            fuzzy_penalty: default_fuzzy_penalty(),
            synonyms_enabled: true,
            synonyms: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Default number of suggestions when the request leaves limit unset
    #[serde(default = "default_suggest_limit")]
    pub default_limit: usize,

    /// Upper bound on the suggestion limit
    #[serde(default = "default_suggest_max_limit")]
    pub max_limit: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            default_limit: default_suggest_limit(),
            max_limit: default_suggest_max_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Gap (seconds) above which consecutive events start a new search session
    #[serde(default = "default_session_gap")]
    pub session_gap_secs: u64,

    /// Cap on top-query / top-content lists in stats responses
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            session_gap_secs: default_session_gap(),
            top_limit: default_top_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8600
}

fn default_request_timeout() -> u64 {
    30
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/content-search")
}

fn default_batch_size() -> usize {
    200
}

fn default_min_token_len() -> usize {
    2
}

fn default_per_page() -> usize {
    10
}

fn default_max_per_page() -> usize {
    100
}

fn default_title_weight() -> f64 {
    10.0
}

fn default_content_weight() -> f64 {
    3.0
}

fn default_excerpt_weight() -> f64 {
    1.0
}

fn default_recency_weight() -> f64 {
    0.5
}

fn default_views_weight() -> f64 {
    0.25
}

fn default_max_edit_distance() -> u32 {
    2
}

fn default_fuzzy_penalty() -> f64 {
    0.5
}

fn default_suggest_limit() -> usize {
    10
}

fn default_suggest_max_limit() -> usize {
    25
}

fn default_session_gap() -> u64 {
    300
}

fn default_top_limit() -> usize {
    10
}

fn default_true() -> bool {
    true
}

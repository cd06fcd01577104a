//! Search analytics: event recording, aggregate statistics, and search
//! experience quality metrics.
//!
//! Recording is fire-and-forget from the search path; reporting aggregates
//! over a trailing window of whole days. History survives restarts when the
//! engine is opened against the embedded database.

mod engine;
mod error;
mod metrics;
mod persist;

pub use engine::{AnalyticsEngine, SearchRecord};
pub use error::{AnalyticsError, AnalyticsResult};
pub use metrics::{ContentClicks, DayCount, QualityMetrics, QueryCount, SearchStats};
pub use persist::AnalyticsPersistence;

use crate::analytics::{QualityMetrics, SearchRecord, SearchStats};
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::indexer::{IndexerStats, JobKind, JobProgress, RebuildOptions, RebuildTarget};
use crate::models::{ObjectType, Suggestion};
use crate::search::{OrderBy, SearchError, SearchRequest, SearchResponse, TypeFilter};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        indexed_entries: state.store.len() as u64,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub indexed_entries: u64,
}

/// Execute a search and record it for analytics
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Json<SearchApiResponse>> {
    let type_filter = match &params.object_type {
        Some(raw) => TypeFilter::from_str(raw)?,
        None => TypeFilter::All,
    };
    let order_by = match &params.order_by {
        Some(raw) => OrderBy::from_str(raw)
            .map_err(|_| SearchError::InvalidOrder(raw.clone()))?,
        None => OrderBy::Relevance,
    };

    let request = SearchRequest::new(params.q.clone())
        .with_type(type_filter)
        .with_page(
            params.page.unwrap_or(1),
            params.per_page.unwrap_or_else(|| state.engine.default_per_page()),
        )
        .with_order(order_by);

    let response = state.engine.search(&request)?;

    let event_id = state.analytics.record_search(SearchRecord {
        query: params.q,
        user_id: header_user_id(&headers),
        result_count: response.total as u64,
        ip: header_client_ip(&headers),
        user_agent: header_str(&headers, "user-agent"),
    });

    Ok(Json(SearchApiResponse { event_id, response }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub order_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchApiResponse {
    /// Correlate a later click report to this search
    pub event_id: Uuid,
    #[serde(flatten)]
    pub response: SearchResponse,
}

/// Attach a click outcome to a recorded search
pub async fn record_click(
    State(state): State<AppState>,
    Json(request): Json<ClickRequest>,
) -> Result<Json<ClickResponse>> {
    request.validate()?;

    let recorded = state.analytics.record_click(
        request.event_id,
        request.result_id,
        request.result_type,
        request.position,
    );

    Ok(Json(ClickResponse { recorded }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClickRequest {
    pub event_id: Uuid,
    pub result_id: u64,
    pub result_type: ObjectType,
    /// 1-based rank of the clicked result
    #[validate(range(min = 1))]
    pub position: u32,
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    /// False for unknown events and repeat clicks
    pub recorded: bool,
}

/// Autocomplete suggestions for a partial query
pub async fn suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
    headers: HeaderMap,
) -> Result<Json<SuggestResponse>> {
    let suggestions =
        state
            .suggester
            .suggest(&params.q, header_user_id(&headers), params.limit);
    Ok(Json(SuggestResponse { suggestions }))
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<Suggestion>,
}

/// Start a background index rebuild
pub async fn start_rebuild(
    State(state): State<AppState>,
    request: Option<Json<RebuildRequest>>,
) -> Result<(StatusCode, Json<JobAccepted>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let target = match &request.target {
        Some(raw) => RebuildTarget::from_str(raw).map_err(AppError::Validation)?,
        None => RebuildTarget::All,
    };
    let options = RebuildOptions {
        batch_size: request.batch_size,
        clear_first: request.clear_first,
    };

    let handle = state.indexer.spawn_rebuild(target, options);
    let job_id = state.jobs.register(handle);
    tracing::info!(job_id = %job_id, "Rebuild job accepted");

    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RebuildRequest {
    /// "all" (default), "post", "comment", or "user"
    pub target: Option<String>,
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub clear_first: bool,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
}

/// Start a background optimize (orphan cleanup + compaction)
pub async fn start_optimize(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobAccepted>)> {
    let handle = state.indexer.spawn_optimize();
    let job_id = state.jobs.register(handle);
    tracing::info!(job_id = %job_id, "Optimize job accepted");

    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })))
}

/// Get progress of a background job
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>> {
    let handle = state
        .jobs
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

    Ok(Json(JobStatusResponse {
        job_id: id,
        kind: handle.kind,
        progress: handle.progress(),
    }))
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub kind: JobKind,
    #[serde(flatten)]
    pub progress: JobProgress,
}

/// Request cancellation of a running job
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>> {
    let handle = state
        .jobs
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

    if handle.progress().state.is_terminal() {
        return Err(AppError::JobConflict(format!("Job {id} already finished")));
    }

    handle.cancel();
    tracing::info!(job_id = %id, "Job cancellation requested");

    Ok(Json(JobStatusResponse {
        job_id: id,
        kind: handle.kind,
        progress: handle.progress(),
    }))
}

/// Index size and freshness
pub async fn index_stats(State(state): State<AppState>) -> Result<Json<IndexStatsResponse>> {
    Ok(Json(IndexStatsResponse {
        index: state.indexer.stats(),
        distinct_tokens: state.store.vocabulary().len() as u64,
    }))
}

#[derive(Debug, Serialize)]
pub struct IndexStatsResponse {
    #[serde(flatten)]
    pub index: IndexerStats,
    pub distinct_tokens: u64,
}

/// Aggregate search statistics over a trailing window
pub async fn analytics_stats(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<SearchStats>> {
    let stats = state.analytics.stats(params.days())?;
    Ok(Json(stats))
}

/// Search experience quality over a trailing window
pub async fn analytics_quality(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<QualityMetrics>> {
    let metrics = state.analytics.quality_metrics(params.days())?;
    Ok(Json(metrics))
}

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub days: Option<u32>,
}

impl WindowParams {
    fn days(&self) -> u32 {
        self.days.unwrap_or(30)
    }
}

/// Drop recorded analytics history
pub async fn purge_analytics(
    State(state): State<AppState>,
    request: Option<Json<PurgeRequest>>,
) -> Result<Json<PurgeResponse>> {
    let older_than_days = request.and_then(|Json(r)| r.older_than_days);
    let removed = state.analytics.purge(older_than_days);
    tracing::info!(removed, "Analytics history purged");

    Ok(Json(PurgeResponse { removed }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    /// Keep this many trailing days; omit to clear everything
    pub older_than_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub removed: u64,
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn header_user_id(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// First hop of x-forwarded-for, set by the fronting proxy
fn header_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

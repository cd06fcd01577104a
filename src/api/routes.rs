use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::health_check))
        // Search
        .route("/v1/search", get(handlers::search))
        .route("/v1/search/click", post(handlers::record_click))
        .route("/v1/suggest", get(handlers::suggest))
        // Index administration
        .route("/v1/admin/rebuild", post(handlers::start_rebuild))
        .route("/v1/admin/optimize", post(handlers::start_optimize))
        .route("/v1/admin/jobs/:id", get(handlers::get_job))
        .route("/v1/admin/jobs/:id/cancel", post(handlers::cancel_job))
        .route("/v1/admin/stats", get(handlers::index_stats))
        .route("/v1/admin/analytics/purge", post(handlers::purge_analytics))
        // Analytics reporting
        .route("/v1/analytics/stats", get(handlers::analytics_stats))
        .route("/v1/analytics/quality", get(handlers::analytics_quality))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}

//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - health under `/api/v1/health`
/// - problem detail and grading under `/problems/...`
/// - question creation and job status under `/questions/...`
/// - browsing read models under `/problems_ui/...` and `/audio`
/// - static frontend from `./static` with index fallback
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/problems/:question_id", get(http::http_get_problem))
        .route("/problems/:question_id/run_code", post(http::http_post_run_code))
        .route("/questions/create", post(http::http_post_create_question))
        .route("/questions/jobs/:job_id", get(http::http_get_job))
        .route("/problems_ui/all_problems", get(http::http_get_all_problems))
        .route("/problems_ui/user_problems", get(http::http_get_user_problems))
        .route("/audio", get(http::http_get_audio))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

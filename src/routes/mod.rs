//! Router assembly: HTTP endpoints, static files, CORS, body limits and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Headroom over the document limit for the other multipart fields and boundaries.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router with:
/// - API under `/api/v1/...`
/// - Static front-end from `./static` with index fallback
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - request body limit derived from `max_upload_bytes`
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let body_limit = state.settings.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/quiz", post(http::http_post_quiz))
        .route("/api/v1/quiz/text", post(http::http_post_quiz_text))
        .route("/api/v1/parse", post(http::http_post_parse))
        .route("/api/v1/check", post(http::http_post_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

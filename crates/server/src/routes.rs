use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, Level};

use common::types::Health;
use service::CacheService;

pub mod cache;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: CacheService,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> (StatusCode, String) {
    match service::metrics::encode_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!(error = %e, "metrics encode failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"))
        }
    }
}

/// Build the full application router.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let ops = Router::new()
        .route("/set", post(cache::set_value).put(cache::set_value))
        .route("/get", get(cache::get_value))
        .route("/remove", post(cache::remove_value).delete(cache::remove_value));

    Router::new()
        .route("/", get(cache::hello))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(ops)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/evaluate", post(handlers::handle_evaluate))
        .route("/api/v1/optimize", post(handlers::handle_optimize))
        .route(
            "/api/v1/optimize/download/txt",
            post(handlers::handle_download_txt),
        )
        .route(
            "/api/v1/optimize/download/pdf",
            post(handlers::handle_download_pdf),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

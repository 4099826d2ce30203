pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth_handlers;
use crate::pipeline::handlers as extraction_handlers;
use crate::state::AppState;

/// Uploaded contracts can be sizeable scans; allow up to 25 MiB.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Extraction API
        .route("/api/extract", post(extraction_handlers::handle_extract))
        .route(
            "/api/extractions",
            get(extraction_handlers::handle_list_extractions),
        )
        .route(
            "/api/extractions/:id",
            get(extraction_handlers::handle_get_extraction),
        )
        // Auth API
        .route("/api/auth/register", post(auth_handlers::handle_register))
        .route("/api/auth/login", post(auth_handlers::handle_login))
        .route("/api/auth/me", get(auth_handlers::handle_me))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

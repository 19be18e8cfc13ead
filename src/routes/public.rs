use crate::{ApiDoc, AppState, handlers};
use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

/// Public Router Module
///
/// Endpoints that demonstrate nothing: discovery and monitoring.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Lists every lab route and the identity header to use.
        .route("/", get(handlers::index))
        // GET /health
        // Liveness probe.
        .route("/health", get(|| async { "ok" }))
        // GET /api-docs/openapi.json
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
}

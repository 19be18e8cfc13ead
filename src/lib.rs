use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// The user store, the identity it backs, and the handlers built on both.
pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod models;
pub mod objects;
pub mod repository;

// Route segregation: public plumbing, `/vuln/*` and `/safe/*`. Each vulnerable
// route has a safe twin at the same path under the other prefix.
pub mod routes;
use routes::{public, safe, vulnerable};

// --- Public Re-exports ---

// What `main.rs` and the integration tests need to assemble an `AppState`.
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{RepositoryState, SqliteRepository};

/// ApiDoc
///
/// The OpenAPI document for every lab route, generated from the
/// `#[utoipa::path]` and `ToSchema` annotations and served as JSON at
/// `/api-docs/openapi.json`.
///
/// The vulnerable and safe variants of a route are listed next to each other so
/// the document doubles as a map of the exercise: the two differ only in
/// response shape and in which error responses the safe one can produce.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index,
        handlers::vuln_list_users, handlers::safe_list_users,
        handlers::vuln_delete_user, handlers::safe_delete_user,
        handlers::vuln_load_object, handlers::safe_parse_json,
        handlers::vuln_ping, handlers::safe_ping
    ),
    components(
        schemas(
            models::UserRow, models::RawUserRow, models::DeleteResponse, models::LoadedResponse,
            models::MessageEcho, models::ShellPingResponse, models::PingResponse,
            models::RouteIndex, error::ErrorBody,
        )
    ),
    tags(
        (name = "vuln-lab", description = "Vulnerable and remediated handlers, side by side")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Everything a handler can reach, cloned into each request. Both members are
/// cheap to clone: the repository is an `Arc` and the config is a handful of
/// strings read once at startup.
///
/// Nothing here carries per-request data. In particular the acting identity is
/// never cached: the `Actor` extractor resolves the `X-User` claim against the
/// store on every request that asks for it.
#[derive(Clone)]
pub struct AppState {
    /// User store. Shared by the query and mutation handlers and the actor resolver.
    pub repo: RepositoryState,
    /// Loaded configuration. The ping handlers read `ping_program` from it.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Handlers take `State<RepositoryState>` or `State<AppConfig>` rather than the
// whole `AppState`, and the guard middleware only sees the repository through
// the `Actor` extractor's `RepositoryState: FromRef<S>` bound.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Builds the lab's full routing tree and wraps it in the request-scoped
/// observability layers.
///
/// Layout:
/// 1. `/`, `/health` and `/api-docs/openapi.json` with no guard.
/// 2. `/vuln/*`: every handler reachable by anyone; the identity header is
///    ignored.
/// 3. `/safe/*`: the remediated twins. Only `/safe/admin/delete` is wrapped by
///    `auth::require_admin`, as a `route_layer` inside `safe::safe_routes`, so an
///    unknown path under `/safe` is still a plain 404 rather than a 403.
pub fn create_router(state: AppState) -> Router {
    // Any origin may call the lab.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let routes = Router::new()
        .merge(public::public_routes())
        .nest("/vuln", vulnerable::vulnerable_routes())
        .nest("/safe", safe::safe_routes(state.clone()))
        .with_state(state);

    // Outermost first: the id is assigned before the span opens, so the span and
    // every event logged by a handler (the interpolated SQL, a rejected
    // non-admin, an unhandled fault) carry it. The same id goes back to the
    // client in `x-request-id`.
    let observability = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(tower_http::LatencyUnit::Millis),
                ),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id));

    routes.layer(observability).layer(cors)
}

/// request_span
///
/// Opens the span for one request. Besides method and URI it records the raw
/// `X-User` claim as sent, before any resolution, so a log reader can see who a
/// request *claimed* to be next to what the guard decided.
fn request_span(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown");

    let claimed_user = request
        .headers()
        .get(auth::IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        req_id = %request_id,
        claimed_user = %claimed_user,
    )
}

use crate::{AppState, auth, handlers};
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

/// Safe Router Module
///
/// The remediated counterpart of every vulnerable route.
///
/// Access Control:
/// Only the delete route sits behind `auth::require_admin`. The guard is a
/// `route_layer`, so it runs after routing and before the handler's own
/// extractors; a non-admin caller gets 403 without the handler ever running.
pub fn safe_routes(state: AppState) -> Router<AppState> {
    let guarded = Router::new()
        // DELETE /safe/admin/delete?user=
        // Admin-only, bound parameter.
        .route("/admin/delete", delete(handlers::safe_delete_user))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin));

    Router::new()
        // GET /safe/sql/users?q=
        // Fixed query text, filter bound as a parameter.
        .route("/sql/users", get(handlers::safe_list_users))
        // POST /safe/json
        // UTF-8 JSON with a `msg` key, nothing else.
        .route("/json", post(handlers::safe_parse_json))
        // GET /safe/ping?host=
        // Allow-listed host, explicit argv, no shell.
        .route("/ping", get(handlers::safe_ping))
        .merge(guarded)
}

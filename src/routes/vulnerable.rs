use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Vulnerable Router Module
///
/// Every handler here reproduces a flaw on purpose. None of them validates its
/// input, so none of them has an error path for malicious input.
pub fn vulnerable_routes() -> Router<AppState> {
    Router::new()
        // GET /vuln/sql/users?q=
        // Query text built by string concatenation.
        .route("/sql/users", get(handlers::vuln_list_users))
        // DELETE /vuln/admin/delete?user=
        // No role check, and the target is concatenated into the statement.
        .route("/admin/delete", delete(handlers::vuln_delete_user))
        // POST /vuln/pickle
        // Rebuilds an arbitrary object graph from the raw body.
        .route("/pickle", post(handlers::vuln_load_object))
        // GET /vuln/ping?host=
        // Shell command line built by interpolation.
        .route("/ping", get(handlers::vuln_ping))
}

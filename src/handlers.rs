use crate::{
    config::AppConfig,
    diagnostics,
    error::{self, ApiError, ErrorBody},
    models::{
        DeleteResponse, LoadedResponse, MessageEcho, PingResponse, RawUserRow, RouteIndex,
        ShellPingResponse, UserRow,
    },
    objects,
    repository::RepositoryState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

// --- Query Structs ---

/// SearchParams
///
/// `?q=` filter for the user listing endpoints. Missing means empty.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchParams {
    /// Substring to look for in usernames.
    #[serde(default)]
    pub q: String,
}

/// DeleteParams
///
/// `?user=` target for the delete endpoints.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DeleteParams {
    /// Username to delete.
    pub user: String,
}

/// PingParams
///
/// `?host=` target for the ping endpoints. Defaults to loopback.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PingParams {
    /// Host to send one echo request to.
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

// --- 1) Query language injection ---

/// vuln_list_users
///
/// [Vulnerable] Searches users by splicing `q` straight into the SQL text.
#[utoipa::path(
    get,
    path = "/vuln/sql/users",
    params(SearchParams),
    responses((status = 200, description = "Whatever rows the query produced", body = [RawUserRow]))
)]
pub async fn vuln_list_users(
    State(repo): State<RepositoryState>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<RawUserRow>>, ApiError> {
    let Query(params) = query?;
    let rows = repo.search_users_interpolated(&params.q).await?;
    Ok(Json(rows))
}

/// safe_list_users
///
/// [Safe] Same search, with `q` bound as a parameter.
#[utoipa::path(
    get,
    path = "/safe/sql/users",
    params(SearchParams),
    responses((status = 200, description = "Matching users", body = [UserRow]))
)]
pub async fn safe_list_users(
    State(repo): State<RepositoryState>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<UserRow>>, ApiError> {
    let Query(params) = query?;
    let rows = repo.search_users_bound(&params.q).await?;
    Ok(Json(rows))
}

// --- 2) Broken access control ---

/// vuln_delete_user
///
/// [Vulnerable] Anyone may delete anyone, and the target is spliced into the
/// statement. Reports the requested target whether or not a row matched.
#[utoipa::path(
    delete,
    path = "/vuln/admin/delete",
    params(DeleteParams),
    responses(
        (status = 200, description = "Delete requested", body = DeleteResponse),
        (status = 400, description = "`invalid query`: `user` is missing", body = ErrorBody)
    )
)]
pub async fn vuln_delete_user(
    State(repo): State<RepositoryState>,
    query: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Query(params) = query?;
    let affected = repo.delete_user_interpolated(&params.user).await?;
    tracing::debug!(target_user = %params.user, affected, "interpolated delete done");

    Ok(Json(DeleteResponse {
        deleted: params.user,
    }))
}

/// safe_delete_user
///
/// [Safe] Mounted behind `auth::require_admin`; deletes with a bound
/// parameter. Like the vulnerable variant it echoes the target regardless of
/// the affected-row count.
#[utoipa::path(
    delete,
    path = "/safe/admin/delete",
    params(
        DeleteParams,
        ("X-User" = Option<String>, Header, description = "Identity claim (username)")
    ),
    responses(
        (status = 200, description = "Delete requested", body = DeleteResponse),
        (status = 400, description = "`invalid query`: `user` is missing", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn safe_delete_user(
    State(repo): State<RepositoryState>,
    query: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Query(params) = query?;
    let affected = repo.delete_user_bound(&params.user).await?;
    tracing::debug!(target_user = %params.user, affected, "bound delete done");

    Ok(Json(DeleteResponse {
        deleted: params.user,
    }))
}

// --- 3) Insecure deserialization ---

/// vuln_load_object
///
/// [Vulnerable] Rebuilds whatever object graph the body describes, running any
/// constructors it names. See `objects` for why this is unsafe by construction.
#[utoipa::path(
    post,
    path = "/vuln/pickle",
    request_body(content = String, content_type = "application/msgpack"),
    responses((status = 200, description = "Loaded", body = LoadedResponse))
)]
pub async fn vuln_load_object(body: Bytes) -> Result<Json<LoadedResponse>, ApiError> {
    let value = tokio::task::spawn_blocking(move || objects::load(&body)).await??;

    Ok(Json(LoadedResponse {
        loaded_type: value.type_name().to_string(),
    }))
}

/// safe_parse_json
///
/// [Safe] Accepts only UTF-8 JSON whose top level is an object with a `msg` key.
#[utoipa::path(
    post,
    path = "/safe/json",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Accepted", body = MessageEcho),
        (status = 400, description = "`invalid json` or `schema`", body = ErrorBody)
    )
)]
pub async fn safe_parse_json(body: Bytes) -> Result<Json<MessageEcho>, ApiError> {
    let text = std::str::from_utf8(&body).map_err(|_| ApiError::Validation(error::INVALID_JSON))?;
    let document: serde_json::Value =
        serde_json::from_str(text).map_err(|_| ApiError::Validation(error::INVALID_JSON))?;

    let msg = document
        .as_object()
        .and_then(|map| map.get("msg"))
        .cloned()
        .ok_or(ApiError::Validation(error::SCHEMA))?;

    Ok(Json(MessageEcho { ok: true, msg }))
}

// --- 4) Command injection ---

/// vuln_ping
///
/// [Vulnerable] Interpolates `host` into a shell command line.
#[utoipa::path(
    get,
    path = "/vuln/ping",
    params(PingParams),
    responses((status = 200, description = "Shell exit code", body = ShellPingResponse))
)]
pub async fn vuln_ping(
    State(config): State<AppConfig>,
    query: Result<Query<PingParams>, QueryRejection>,
) -> Result<Json<ShellPingResponse>, ApiError> {
    let Query(params) = query?;
    let exit_code = diagnostics::shell_ping(&config.ping_program, &params.host).await?;
    Ok(Json(ShellPingResponse { exit_code }))
}

/// safe_ping
///
/// [Safe] Rejects any host outside the allow-list before anything is spawned,
/// then runs the diagnostic with an explicit argument vector.
#[utoipa::path(
    get,
    path = "/safe/ping",
    params(PingParams),
    responses(
        (status = 200, description = "Exit code and stdout excerpt", body = PingResponse),
        (status = 400, description = "`invalid host`", body = ErrorBody)
    )
)]
pub async fn safe_ping(
    State(config): State<AppConfig>,
    query: Result<Query<PingParams>, QueryRejection>,
) -> Result<Json<PingResponse>, ApiError> {
    let Query(params) = query?;
    if !diagnostics::is_allowed_host(&params.host) {
        return Err(ApiError::Validation(error::INVALID_HOST));
    }

    let response = diagnostics::exec_ping(&config.ping_program, &params.host).await?;
    Ok(Json(response))
}

// --- Index ---

/// index
///
/// Lists the routes and how to pick an identity.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Route index", body = RouteIndex))
)]
pub async fn index() -> Json<RouteIndex> {
    let routes = [
        "/vuln/sql/users?q=",
        "/safe/sql/users?q=",
        "/vuln/admin/delete?user=",
        "/safe/admin/delete?user=",
        "/vuln/pickle  (POST MessagePack object graph)",
        "/safe/json    (POST JSON)",
        "/vuln/ping?host=",
        "/safe/ping?host=",
    ];

    Json(RouteIndex {
        ok: true,
        routes: routes.iter().map(|r| r.to_string()).collect(),
        tip: "Send the header X-User: alice (admin) or bob (user)".to_string(),
    })
}

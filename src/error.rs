use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::objects::LoadError;

/// Stable short codes returned in 400-class bodies.
pub const INVALID_JSON: &str = "invalid json";
pub const SCHEMA: &str = "schema";
pub const INVALID_HOST: &str = "invalid host";
pub const INVALID_QUERY: &str = "invalid query";

/// ErrorBody
///
/// The JSON body of every non-2xx response produced by the lab.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// ApiError
///
/// `Validation`, `Query` and `Forbidden` are client errors. The remaining
/// variants are faults that are propagated as-is and rendered as a generic
/// 500; nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// A query string the handler's parameters could not be read from, such as
    /// a delete without `user`.
    #[error("bad query string: {0}")]
    Query(#[from] QueryRejection),

    #[error("forbidden")]
    Forbidden,

    #[error("user store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("process error: {0}")]
    Process(#[from] std::io::Error),

    #[error("object load failed: {0}")]
    Load(#[from] LoadError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            ApiError::Validation(code) => (*code).to_string(),
            ApiError::Query(rejection) => {
                tracing::debug!("rejected query string: {}", rejection.body_text());
                INVALID_QUERY.to_string()
            }
            ApiError::Forbidden => "forbidden".to_string(),
            other => {
                tracing::error!("unhandled fault: {}", other);
                "internal".to_string()
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

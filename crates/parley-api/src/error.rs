use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error surface of every handler. Each variant maps to a status code and a
/// JSON body of the form `{"message": ..., "field"?: ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input, rejected before any storage access. HTTP 400.
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<&'static str>,
    },

    /// No or invalid bearer token. HTTP 401.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not an admin. HTTP 403.
    #[error("Forbidden")]
    Forbidden,

    /// Referenced id does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Identity already taken. HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Storage or other unexpected failure. HTTP 500; the cause is logged,
    /// never sent to the client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, field: Option<&'static str>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Validation {
                message,
                field: Some(field),
            } => json!({ "message": message, "field": field }),
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                json!({ "message": "Internal Server Error" })
            }
            other => json!({ "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Body rejections (bad JSON, wrong shape) surface as 400 validation errors
/// instead of axum's default plain-text responses.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text(), None)
    }
}

/// `Json` with the rejection mapped into [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub(crate) fn require_non_empty(value: &str, field: &'static str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(
            format!("{field} must not be empty"),
            Some(field),
        ));
    }
    Ok(())
}

/// A panicked or cancelled blocking task is an internal error, never a client
/// problem.
pub(crate) fn join_error(e: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {}", e);
    ApiError::Internal(anyhow::anyhow!("blocking task failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ApiError::validation("x", None).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn empty_check_reports_field() {
        let err = require_non_empty("   ", "content").unwrap_err();
        match err {
            ApiError::Validation { field, .. } => assert_eq!(field, Some("content")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

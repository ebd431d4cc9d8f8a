use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::errors::{AuthError, CoreError, CoreErrorKind, NodeError};

/// Error returned by every handler, rendered as
/// `{"error": <kind>, "message": ..., "fields": {...}}`
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            CoreErrorKind::Validation => StatusCode::BAD_REQUEST,
            CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
            CoreErrorKind::Conflict => StatusCode::CONFLICT,
            CoreErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            CoreErrorKind::Forbidden => StatusCode::FORBIDDEN,
            CoreErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            CoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = ?self.0, "Request failed");
        }

        let body = json!({
            "error": self.0.kind().code(),
            "message": self.0.message(),
            "fields": self.0.fields(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        Self(err.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

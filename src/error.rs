// HTTP-facing error type: every failure becomes `{success: false, error}`.

use axum::{
    extract::rejection::{BytesRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::BotError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<BotError> for ApiError {
    fn from(err: BotError) -> Self {
        if err.is_validation() {
            ApiError::Validation(err.to_string())
        } else {
            ApiError::NotFound(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::NotFound(msg) = &self {
            tracing::warn!("{msg}");
        }
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

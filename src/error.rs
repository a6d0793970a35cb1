//! HTTP-facing error type and the pipeline's fatal error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::analyze::ai_adapter::AiError;
use crate::audio::TranscodeError;
use crate::store::StoreError;

/// Errors that abort note generation. Everything else degrades.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("note generation failed: {0}")]
    Model(#[from] AiError),
    #[error("no content to generate notes from")]
    EmptyInput,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        /// Echo of what the server actually received, for client debugging.
        received: Option<Value>,
    },
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Internal(String),
    #[error("database unavailable: {0}")]
    StoreUnavailable(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            received: None,
        }
    }

    pub fn bad_request_with(message: impl Into<String>, received: Value) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            received: Some(received),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Generation(GenerationError::EmptyInput) => StatusCode::BAD_REQUEST,
            ApiError::Generation(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(m) => ApiError::StoreUnavailable(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TranscodeError> for ApiError {
    fn from(err: TranscodeError) -> Self {
        ApiError::Internal(format!("audio conversion failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        if let ApiError::BadRequest {
            received: Some(received),
            ..
        } = &self
        {
            body["received"] = received.clone();
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("n".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(GenerationError::Model(AiError::EmptyResponse)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(StoreError::Corrupt("bad".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn model_message_is_surfaced() {
        let err = ApiError::from(GenerationError::Model(AiError::Mock("quota exceeded".into())));
        assert!(err.to_string().contains("quota exceeded"));
    }
}

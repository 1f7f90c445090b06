use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{llm::LlmError, media::MediaError, store::StoreError};

/// Error surfaced at the HTTP boundary.
///
/// Everything except `InvalidRequest` renders as a 500 with a readable `detail`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")] Configuration(String),
    #[error("External service error: {0}")] ExternalService(String),
    #[error("Validation error: {0}")] Validation(String),
    #[error("Storage error: {0}")] Storage(String),
    #[error("Invalid request: {0}")] InvalidRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self { AppError::Storage(err.to_string()) }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingCredential(_) => AppError::Configuration(err.to_string()),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::MissingCredential => AppError::Configuration(err.to_string()),
            MediaError::InvalidReference(_) => AppError::InvalidRequest(err.to_string()),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self { AppError::InvalidRequest(err.to_string()) }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self { AppError::InvalidRequest(rejection.body_text()) }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self { AppError::InvalidRequest(rejection.body_text()) }
}

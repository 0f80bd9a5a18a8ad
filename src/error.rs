//! Error taxonomy shared by the pipelines.
//!
//! Parse failures of model output are deliberately absent here: a response
//! that is not the expected structured form yields zero extracted facts
//! (see [`crate::ingest::extract::parse_facts`]), never an error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure of the durable store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database failure: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The blocking task running the database operation failed or the
    /// connection lock was poisoned.
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Failure of the external text-generation endpoint.
///
/// The client never retries; callers decide whether a failed call is
/// skipped (ingestion) or degraded (recall).
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("inference endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("inference response carried no completion text")]
    MalformedResponse,
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing required input, rejected before any side effect.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Inference(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

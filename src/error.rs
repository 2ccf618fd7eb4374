// src/error.rs
// Domain error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Typed failures surfaced to callers. Page- and record-level ingestion
/// problems are absorbed inside the pipeline and never reach this enum.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("no catalog entry matches `{0}`")]
    TitleNotFound(String),

    /// Ingestion completed but yielded nothing; the previous snapshot stays
    /// installed and the caller decides whether to retry.
    #[error("ingestion produced an empty catalog")]
    EmptyCatalog,

    /// Zero numeric attributes survived feature selection.
    #[error("no usable numeric attributes for feature standardization")]
    NoFeatures,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RecommendError {
    fn status(&self) -> StatusCode {
        match self {
            RecommendError::TitleNotFound(_) => StatusCode::NOT_FOUND,
            RecommendError::EmptyCatalog => StatusCode::SERVICE_UNAVAILABLE,
            RecommendError::NoFeatures => StatusCode::UNPROCESSABLE_ENTITY,
            RecommendError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

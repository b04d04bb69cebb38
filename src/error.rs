use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Conditions that end a request. Everything downstream of a non-empty
/// labeled-scene sequence degrades instead of landing here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Either title or custom_plot must be provided")]
    MissingInput,

    #[error("Could not find plot for '{0}'")]
    SourceNotFound(String),

    #[error("Plot source unavailable: {0:#}")]
    SourceUnavailable(anyhow::Error),

    #[error("Could not break the plot into analysable chunks")]
    SegmentationEmpty,

    #[error("Emotion classifier is unavailable: {0}")]
    ClassificationUnavailable(String),

    #[error("Failed to classify emotions for the provided plot")]
    ClassificationEmpty,

    #[error("Analysis task failed: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::MissingInput => "BAD_REQUEST",
            PipelineError::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            PipelineError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            PipelineError::SegmentationEmpty => "SEGMENTATION_EMPTY",
            PipelineError::ClassificationUnavailable(_) => "CLASSIFICATION_UNAVAILABLE",
            PipelineError::ClassificationEmpty => "CLASSIFICATION_EMPTY",
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::MissingInput => StatusCode::BAD_REQUEST,
            PipelineError::SourceNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            PipelineError::SegmentationEmpty => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::ClassificationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::ClassificationEmpty => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP-facing error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Pipeline(e) => (e.status(), e.code(), e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

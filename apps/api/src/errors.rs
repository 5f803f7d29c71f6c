use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::analysis::orchestrator::StartError;
use crate::llm_client::LlmError;

/// Category of a failed analysis run. Carried by `AnalysisRunState::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UnsupportedFormat,
    ExtractionFailure,
    RemoteServiceFailure,
    RemoteServiceRejected,
    MalformedResponse,
    SchemaViolation,
}

/// Every failure an analysis run can end in. All of them are terminal for the run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Unsupported file format '{0}'. Please upload a PDF or DOCX file.")]
    UnsupportedFormat(String),

    #[error("Failed to extract text from the resume: {0}")]
    ExtractionFailure(String),

    #[error("Analysis service failed: {0}")]
    RemoteServiceFailure(String),

    #[error("Analysis service rejected the request: {0}")]
    RemoteServiceRejected(String),

    #[error("Analysis response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("Analysis response does not match the expected schema: {0}")]
    SchemaViolation(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            AnalysisError::ExtractionFailure(_) => ErrorKind::ExtractionFailure,
            AnalysisError::RemoteServiceFailure(_) => ErrorKind::RemoteServiceFailure,
            AnalysisError::RemoteServiceRejected(_) => ErrorKind::RemoteServiceRejected,
            AnalysisError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            AnalysisError::SchemaViolation(_) => ErrorKind::SchemaViolation,
        }
    }
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Blocked { reason } => AnalysisError::RemoteServiceRejected(reason),
            other => AnalysisError::RemoteServiceFailure(other.to_string()),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StartError> for AppError {
    fn from(err: StartError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                self.to_string(),
            ),
            AppError::Analysis(err) => {
                let status = match err.kind() {
                    ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    ErrorKind::ExtractionFailure | ErrorKind::RemoteServiceRejected => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ErrorKind::RemoteServiceFailure
                    | ErrorKind::MalformedResponse
                    | ErrorKind::SchemaViolation => {
                        tracing::error!("Analysis error: {err}");
                        StatusCode::BAD_GATEWAY
                    }
                };
                (status, error_code(err.kind()), err.to_string())
            }
            AppError::Llm(LlmError::Blocked { reason }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "REMOTE_SERVICE_REJECTED",
                format!("The assistant declined to answer: {reason}"),
            ),
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "REMOTE_SERVICE_FAILURE",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code
        }));

        (status, body).into_response()
    }
}

fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
        ErrorKind::ExtractionFailure => "EXTRACTION_FAILURE",
        ErrorKind::RemoteServiceFailure => "REMOTE_SERVICE_FAILURE",
        ErrorKind::RemoteServiceRejected => "REMOTE_SERVICE_REJECTED",
        ErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
        ErrorKind::SchemaViolation => "SCHEMA_VIOLATION",
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::api_client::TrackerApiError;
use crate::reconcile::ReconcileError;
use crate::rewrite::PollError;

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

    #[error("Rewrite job still running after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("Rewrite job failed: {0}")]
    PollFailed(String),

    #[error("Saving the final document failed: {0}")]
    SaveFailure(String),

    #[error("Tracker backend error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TrackerApiError> for AppError {
    fn from(e: TrackerApiError) -> Self {
        match e {
            TrackerApiError::Api { status: 404, message } => AppError::NotFound(message),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::UnknownChange(_) => AppError::NotFound(e.to_string()),
            ReconcileError::KindMismatch { .. } => AppError::Validation(e.to_string()),
        }
    }
}

impl From<PollError> for AppError {
    fn from(e: PollError) -> Self {
        match e {
            PollError::Timeout { attempts } => AppError::PollTimeout { attempts },
            PollError::Failed(message) => AppError::PollFailed(message),
            PollError::Cancelled => AppError::Conflict("rewrite polling was cancelled".into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::PollTimeout { .. } => {
                tracing::warn!("{self}");
                (StatusCode::GATEWAY_TIMEOUT, "POLL_TIMEOUT", self.to_string())
            }
            AppError::PollFailed(msg) => {
                tracing::warn!("Rewrite job failed: {msg}");
                (StatusCode::BAD_GATEWAY, "POLL_FAILED", msg.clone())
            }
            AppError::SaveFailure(msg) => {
                tracing::error!("Save failed: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "SAVE_FAILURE",
                    "The final document could not be saved; your choices are unchanged".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Tracker backend error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The tracker backend request failed".to_string(),
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
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::profiles::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Extraction ran but produced nothing usable. Carries a machine-readable kind.
    #[error("Unprocessable entity ({kind}): {message}")]
    Unprocessable { kind: String, message: String },

    #[error("Skill extraction failed: {0}")]
    SkillExtractionFailed(String),

    /// The profile store is down as a whole. Never folded into per-file results.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND".to_string(), msg.clone()),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                msg.clone(),
            ),
            AppError::Unprocessable { kind, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                kind.to_uppercase(),
                message.clone(),
            ),
            AppError::SkillExtractionFailed(msg) => {
                tracing::warn!("Skill extraction failed: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "SKILL_EXTRACTION_FAILED".to_string(),
                    "Failed to extract skills from job description".to_string(),
                )
            }
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Profile store unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE".to_string(),
                    "Profile storage is currently unavailable".to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR".to_string(),
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR".to_string(),
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

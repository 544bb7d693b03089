#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

/// Application-level error type covering the approval pipeline taxonomy:
/// validation (bad input, rejected before side effects), configuration
/// (missing credential/URL), upstream (non-success HTTP from an external
/// service, carrying status and body), and format (unexpected response
/// shape). Implements `IntoResponse` so handlers return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{service} returned {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::Upstream {
                service,
                status,
                body,
            } => {
                tracing::error!("Upstream error from {service} ({status}): {body}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    format!("{service} request failed with status {status}"),
                    Some(body.clone()),
                )
            }
            AppError::Format(msg) => {
                tracing::error!("Format error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FORMAT_ERROR",
                    msg.clone(),
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "details": details,
            },
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display_carries_status_and_body() {
        let err = AppError::Upstream {
            service: "qdrant",
            status: 503,
            body: "collection not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("qdrant"));
        assert!(msg.contains("503"));
        assert!(msg.contains("collection not found"));
    }

    #[test]
    fn test_validation_error_maps_to_400() {
        let response = AppError::Validation("job_title is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_error_maps_to_500() {
        let response = AppError::Upstream {
            service: "modal",
            status: 429,
            body: "rate limited".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

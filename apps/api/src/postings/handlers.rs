//! Axum route handlers for the Postings API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::posting::{JobPostingRow, PostingInput};
use crate::postings::approval::{approve_posting, ApprovalResponse, ApprovePostingRequest};
use crate::postings::generator::generate_posting;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GeneratePostingRequest {
    #[serde(flatten)]
    pub input: PostingInput,
}

#[derive(Debug, Serialize)]
pub struct GeneratePostingResponse {
    pub natural_posting: String,
    /// Structured block serialized to a JSON string — the approval
    /// endpoint receives it back verbatim.
    pub structured_data: String,
}

#[derive(Debug, Serialize)]
pub struct ListPostingsResponse {
    pub postings: Vec<JobPostingRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/postings/generate
///
/// Generates a natural-language posting plus structured data from the
/// form fields. Nothing is persisted until approval.
pub async fn handle_generate_posting(
    State(state): State<AppState>,
    Json(request): Json<GeneratePostingRequest>,
) -> Result<Json<GeneratePostingResponse>, AppError> {
    validate_input(&request.input)?;

    let generated = generate_posting(&state.llm, &request.input).await?;

    Ok(Json(GeneratePostingResponse {
        natural_posting: generated.natural_posting,
        structured_data: generated.structured_data.to_string(),
    }))
}

/// POST /api/v1/postings/approve
///
/// Full approval pipeline: persist → embed → upload vector → find
/// similar employees → enrich with promotion probabilities.
pub async fn handle_approve_posting(
    State(state): State<AppState>,
    Json(request): Json<ApprovePostingRequest>,
) -> Result<Json<ApprovalResponse>, AppError> {
    if request.natural_posting.trim().is_empty() {
        return Err(AppError::Validation(
            "natural_posting cannot be empty".to_string(),
        ));
    }
    if request.structured_data.trim().is_empty() {
        return Err(AppError::Validation(
            "structured_data cannot be empty".to_string(),
        ));
    }
    validate_input(&request.original_input)?;

    let response = approve_posting(&state, request).await?;

    Ok(Json(response))
}

/// GET /api/v1/postings
///
/// All persisted postings, newest first.
pub async fn handle_list_postings(
    State(state): State<AppState>,
) -> Result<Json<ListPostingsResponse>, AppError> {
    let postings = sqlx::query_as::<_, JobPostingRow>(
        "SELECT * FROM job_postings ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ListPostingsResponse { postings }))
}

fn validate_input(input: &PostingInput) -> Result<(), AppError> {
    for (value, field) in [
        (&input.job_title, "job_title"),
        (&input.career_level, "career_level"),
        (&input.location, "location"),
        (&input.department, "department"),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} cannot be empty")));
        }
    }
    Ok(())
}

//! Submission API endpoints: the public form and the admin review actions.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateSubmissionRequest, JoinType, ReviewRequest, Submission, SubmissionStatus,
};
use crate::sync::{ReviewOutcome, SubmissionStore};
use crate::AppState;

/// POST /api/submissions - Submit a community for review.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(request): Json<CreateSubmissionRequest>,
) -> ApiResult<Submission> {
    // Validate required fields
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Community name is required".to_string()));
    }
    if request.category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".to_string()));
    }
    if request.description.trim().is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }
    if request.founder_name.trim().is_empty() {
        return Err(AppError::Validation("Founder name is required".to_string()));
    }
    match request.join_type {
        JoinType::Paid => {
            if request.price.unwrap_or(0) <= 0 {
                return Err(AppError::Validation(
                    "Paid communities require a positive price".to_string(),
                ));
            }
        }
        JoinType::Free => {
            if request
                .join_link
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
            {
                return Err(AppError::Validation(
                    "Free communities require a join link".to_string(),
                ));
            }
        }
    }

    let submission = state.repo.create_submission(&request).await?;
    success(submission)
}

#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /api/submissions - List submissions, optionally by status. Admin.
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListSubmissionsQuery>,
) -> ApiResult<Vec<Submission>> {
    let submissions = match query.status.as_deref() {
        Some(raw) => {
            let status = SubmissionStatus::from_str(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown status {}", raw)))?;
            state.repo.list_by_status(status).await?
        }
        None => state.repo.list_submissions().await?,
    };
    success(submissions)
}

/// GET /api/submissions/:id - Get a single submission. Admin.
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Submission> {
    let submission = state
        .repo
        .get_submission(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;
    success(submission)
}

/// POST /api/submissions/:id/approve - Approve a submission. Admin.
pub async fn approve_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<ReviewOutcome> {
    let outcome = state
        .orchestrator
        .review(&id, SubmissionStatus::Approved, request.notes)
        .await?;
    success(outcome)
}

/// POST /api/submissions/:id/reject - Reject a submission. Admin.
pub async fn reject_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<ReviewOutcome> {
    let outcome = state
        .orchestrator
        .review(&id, SubmissionStatus::Rejected, request.notes)
        .await?;
    success(outcome)
}

/// DELETE /api/submissions/:id - Delete a submission. Admin, destructive.
pub async fn delete_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_submission(&id).await?;
    success(())
}

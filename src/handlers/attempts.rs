// src/handlers/attempts.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::quiz_attempt::{AttemptListParams, SubmitAttemptRequest},
    services::Services,
    utils::jwt::Actor,
};

/// Lists attempts, newest first.
///
/// * Admins: all attempts, optionally filtered by `quiz_id` / `user_id`.
/// * Students: their own attempts only.
pub async fn list_attempts(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = services.attempts.list(&actor, params).await?;
    Ok(Json(attempts))
}

/// Results detail: the attempt, who took it, and each frozen question with
/// the recorded answer.
pub async fn get_attempt(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = services.attempts.detail(&actor, id).await?;
    Ok(Json(detail))
}

/// Submits the answers of an attempt.
///
/// * Answers are graded against the snapshot taken at start.
/// * 409 if the attempt was already submitted.
/// * Returns the completed attempt with `score` and `total_questions`.
pub async fn submit_attempt(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = services.attempts.submit(&actor, id, payload).await?;
    Ok(Json(result))
}

/// Deletes an attempt and its answers (Admin only).
pub async fn delete_attempt(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.attempts.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/quizzes.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::IdsQuery,
    models::quiz::{QuizInput, QuizUpdate, StatusChange},
    services::Services,
    utils::jwt::Actor,
};

/// Lists quizzes, newest first, each with its creator.
///
/// * Students only see active quizzes.
/// * `ids=a,b` restricts the list to those quizzes.
pub async fn list_quizzes(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Query(ids): Query<IdsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = match ids.parse()? {
        Some(ids) => services.quizzes.list_by_ids(&actor, &ids).await?,
        None => services.quizzes.list(&actor).await?,
    };
    Ok(Json(quizzes))
}

/// Fetches one quiz. Inactive quizzes are 404 for students.
pub async fn get_quiz(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = services.quizzes.get(&actor, id).await?;
    Ok(Json(quiz))
}

/// Creates a quiz (Admin only).
///
/// * The caller is recorded as creator.
/// * The description is sanitized before it is stored.
pub async fn create_quiz(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<QuizInput>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = services.quizzes.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates title, description or status (Admin only).
pub async fn update_quiz(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuizUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = services.quizzes.update(&actor, id, payload).await?;
    Ok(Json(quiz))
}

/// Activates or deactivates a quiz (Admin only).
///
/// Returns the refreshed quiz plus its question count and whether it meets
/// the configured minimum.
pub async fn set_quiz_status(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChange>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = services.quizzes.set_active(&actor, id, payload.is_active).await?;
    Ok(Json(outcome))
}

/// Deletes a quiz and its questions (Admin only).
pub async fn delete_quiz(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.quizzes.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Questions of one quiz. Students never receive `correct_answer`.
pub async fn list_quiz_questions(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let questions = services.questions.list_for_quiz(&actor, id).await?;
    Ok(Json(questions))
}

/// Starts an attempt.
///
/// * Freezes the quiz and its questions into the attempt.
/// * Returns 201 Created with the attempt and the questions to answer.
pub async fn start_attempt(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let started = services.attempts.start(&actor, id).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

// src/handlers/questions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::question::{QuestionInput, QuestionUpdate},
    services::Services,
    utils::jwt::Actor,
};

/// Question bank across all quizzes (Admin only).
pub async fn list_questions(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let questions = services.questions.list(&actor).await?;
    Ok(Json(questions))
}

pub async fn get_question(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let question = services.questions.get(&actor, id).await?;
    Ok(Json(question))
}

/// Creates a question (Admin only).
///
/// * 2 to 10 options; the correct answer must be one of them.
/// * 404 if the quiz does not exist.
pub async fn create_question(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<QuestionInput>,
) -> Result<impl IntoResponse, AppError> {
    let question = services.questions.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Partially updates a question (Admin only). The merged result is validated.
pub async fn update_question(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let question = services.questions.update(&actor, id, payload).await?;
    Ok(Json(question))
}

pub async fn delete_question(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.questions.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

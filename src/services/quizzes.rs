// src/services/quizzes.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::quiz::{ActivationOutcome, Quiz, QuizInput, QuizUpdate},
    repositories::{QuestionRepository, QuizRepository, Repositories},
    utils::{html::clean_description, jwt::Actor},
};

#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    min_questions: usize,
    enforce_min: bool,
}

impl QuizService {
    pub fn new(repos: &Repositories, config: &Config) -> Self {
        Self {
            quizzes: repos.quizzes.clone(),
            questions: repos.questions.clone(),
            min_questions: config.min_questions_for_activation,
            enforce_min: config.enforce_min_questions,
        }
    }

    /// Admins see every quiz, students only active ones. Newest first.
    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<Quiz>> {
        self.quizzes.list(!actor.is_admin()).await
    }

    pub async fn list_by_ids(&self, actor: &Actor, ids: &[Uuid]) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.list_by_ids(ids).await?;
        if actor.is_admin() {
            return Ok(quizzes);
        }
        Ok(quizzes.into_iter().filter(|q| q.is_active).collect())
    }

    /// Inactive quizzes do not exist as far as students are concerned.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(id)
            .await?
            .filter(|quiz| quiz.is_active || actor.is_admin())
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
    }

    pub async fn create(&self, actor: &Actor, mut input: QuizInput) -> AppResult<Quiz> {
        actor.require_admin()?;
        input.validate()?;

        input.title = input.title.trim().to_string();
        input.description = clean_description(input.description.as_deref());

        let quiz = self.quizzes.create(&input, actor.user_id).await?;
        tracing::info!(quiz = %quiz.id, by = %actor.user_id, "Quiz created");
        Ok(quiz)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, mut update: QuizUpdate) -> AppResult<Quiz> {
        actor.require_admin()?;
        update.validate()?;

        if update.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }

        update.title = update.title.map(|t| t.trim().to_string());
        // An empty description clears the column.
        update.description = update
            .description
            .map(|d| clean_description(Some(&d)).unwrap_or_default());

        let quiz = self.quizzes.update(id, &update).await?;
        tracing::info!(quiz = %quiz.id, by = %actor.user_id, "Quiz updated");
        Ok(quiz)
    }

    /// Flips `is_active` and reports whether the quiz has enough questions.
    ///
    /// The question minimum only blocks activation when enforcement is
    /// configured; otherwise a short quiz is activated with a warning.
    pub async fn set_active(&self, actor: &Actor, id: Uuid, is_active: bool) -> AppResult<ActivationOutcome> {
        actor.require_admin()?;

        if self.quizzes.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let question_count = self.questions.count_by_quiz(id).await?;
        let meets_minimum = question_count >= self.min_questions;

        if is_active && !meets_minimum {
            if self.enforce_min {
                return Err(AppError::BadRequest(format!(
                    "A quiz needs at least {} questions before it can be activated",
                    self.min_questions
                )));
            }
            tracing::warn!(
                quiz = %id,
                question_count,
                minimum = self.min_questions,
                "Activating quiz below the recommended question count"
            );
        }

        let quiz = self.quizzes.set_active(id, is_active).await?;
        tracing::info!(quiz = %id, is_active, by = %actor.user_id, "Quiz status changed");

        Ok(ActivationOutcome {
            quiz,
            question_count,
            minimum_questions: self.min_questions,
            meets_minimum,
        })
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        self.quizzes.delete(id).await?;
        tracing::info!(quiz = %id, by = %actor.user_id, "Quiz deleted");
        Ok(())
    }
}

// src/services/questions.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::question::{PublicQuestion, Question, QuestionInput, QuestionUpdate, QuestionView},
    repositories::{QuestionRepository, QuizRepository, Repositories},
    utils::jwt::Actor,
};

#[derive(Clone)]
pub struct QuestionService {
    questions: Arc<dyn QuestionRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl QuestionService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            questions: repos.questions.clone(),
            quizzes: repos.quizzes.clone(),
        }
    }

    /// Question bank across all quizzes. Admin only.
    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<Question>> {
        actor.require_admin()?;
        self.questions.list().await
    }

    /// Admins get the answer key; students get public questions of active quizzes.
    pub async fn list_for_quiz(&self, actor: &Actor, quiz_id: Uuid) -> AppResult<QuestionView> {
        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .filter(|quiz| quiz.is_active || actor.is_admin())
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        let questions = self.questions.list_by_quiz(quiz.id).await?;
        if actor.is_admin() {
            return Ok(QuestionView::Full(questions));
        }
        Ok(QuestionView::Public(questions.iter().map(PublicQuestion::from).collect()))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Question> {
        actor.require_admin()?;
        self.find(id).await
    }

    pub async fn create(&self, actor: &Actor, input: QuestionInput) -> AppResult<Question> {
        actor.require_admin()?;
        let draft = input.check()?;

        if self.quizzes.find_by_id(draft.quiz_id).await?.is_none() {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let question = self.questions.create(&draft).await?;
        tracing::info!(question = %question.id, quiz = %question.quiz_id, "Question created");
        Ok(question)
    }

    /// Partial edit. The merged question is validated as a whole, so a new
    /// option list must still contain the correct answer.
    pub async fn update(&self, actor: &Actor, id: Uuid, update: QuestionUpdate) -> AppResult<Question> {
        actor.require_admin()?;
        let existing = self.find(id).await?;
        let draft = update.merge(&existing).check()?;

        let question = self.questions.update(id, &draft).await?;
        tracing::info!(question = %id, "Question updated");
        Ok(question)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        self.questions.delete(id).await?;
        tracing::info!(question = %id, "Question deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> AppResult<Question> {
        self.questions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
    }
}

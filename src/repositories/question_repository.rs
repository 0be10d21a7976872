// src/repositories/question_repository.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::question::{Question, QuestionDraft},
    repositories::db_error,
};

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Newest first.
    async fn list(&self) -> AppResult<Vec<Question>>;
    async fn list_by_quiz(&self, quiz_id: Uuid) -> AppResult<Vec<Question>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Question>>;
    async fn count_by_quiz(&self, quiz_id: Uuid) -> AppResult<usize>;
    async fn create(&self, draft: &QuestionDraft) -> AppResult<Question>;
    /// Replaces text, options and answer; the quiz reference never moves.
    async fn update(&self, id: Uuid, draft: &QuestionDraft) -> AppResult<Question>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct PgQuestionRepository {
    pool: PgPool,
}

impl PgQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const QUESTION_COLUMNS: &str = "id, quiz_id, question_text, options, correct_answer, created_at, updated_at";

#[async_trait]
impl QuestionRepository for PgQuestionRepository {
    async fn list(&self) -> AppResult<Vec<Question>> {
        sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list questions", "", e))
    }

    async fn list_by_quiz(&self, quiz_id: Uuid) -> AppResult<Vec<Question>> {
        sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = $1 ORDER BY created_at DESC"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list questions for quiz", "", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Question>> {
        sqlx::query_as::<_, Question>(&format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch question", "", e))
    }

    async fn count_by_quiz(&self, quiz_id: Uuid) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count questions", "", e))?;

        Ok(count.max(0) as usize)
    }

    async fn create(&self, draft: &QuestionDraft) -> AppResult<Question> {
        sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions (quiz_id, question_text, options, correct_answer)
            VALUES ($1, $2, $3, $4)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(draft.quiz_id)
        .bind(&draft.question_text)
        .bind(Json(&draft.options))
        .bind(&draft.correct_answer)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Postgres error code for foreign key violation is 23503
            if e.to_string().contains("23503") || e.to_string().contains("foreign key") {
                AppError::NotFound("Quiz not found".to_string())
            } else {
                db_error("create question", "", e)
            }
        })
    }

    async fn update(&self, id: Uuid, draft: &QuestionDraft) -> AppResult<Question> {
        sqlx::query_as::<_, Question>(&format!(
            r#"
            UPDATE questions
            SET question_text = $1, options = $2, correct_answer = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(&draft.question_text)
        .bind(Json(&draft.options))
        .bind(&draft.correct_answer)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update question", "", e))?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete question", "", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        Ok(())
    }
}

// src/repositories/quiz_attempt_repository.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::quiz_attempt::{AttemptListParams, NewAttempt, QuizAttempt},
    repositories::db_error,
};

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Newest first, optionally narrowed by quiz and/or user.
    async fn list(&self, params: &AttemptListParams) -> AppResult<Vec<QuizAttempt>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QuizAttempt>>;
    /// `started_at` is set by the store.
    async fn create(&self, attempt: NewAttempt) -> AppResult<QuizAttempt>;
    /// Sets `score` and `completed_at = now()` on an open attempt.
    /// `Conflict` if the attempt was already completed.
    async fn complete(&self, id: Uuid, score: i32) -> AppResult<QuizAttempt>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct PgQuizAttemptRepository {
    pool: PgPool,
}

impl PgQuizAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ATTEMPT_COLUMNS: &str = "id, quiz_id, user_id, started_at, completed_at, score, snapshot_quiz";

#[async_trait]
impl QuizAttemptRepository for PgQuizAttemptRepository {
    async fn list(&self, params: &AttemptListParams) -> AppResult<Vec<QuizAttempt>> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE TRUE"));

        if let Some(quiz_id) = params.quiz_id {
            builder.push(" AND quiz_id = ").push_bind(quiz_id);
        }
        if let Some(user_id) = params.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        builder.push(" ORDER BY started_at DESC");

        builder
            .build_query_as::<QuizAttempt>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list quiz attempts", "", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QuizAttempt>> {
        sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch quiz attempt", "", e))
    }

    async fn create(&self, attempt: NewAttempt) -> AppResult<QuizAttempt> {
        sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            INSERT INTO quiz_attempts (quiz_id, user_id, started_at, snapshot_quiz)
            VALUES ($1, $2, NOW(), $3)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(attempt.quiz_id)
        .bind(attempt.user_id)
        .bind(Json(&attempt.snapshot))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create quiz attempt", "", e))
    }

    async fn complete(&self, id: Uuid, score: i32) -> AppResult<QuizAttempt> {
        let completed = sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            UPDATE quiz_attempts
            SET score = $1, completed_at = NOW()
            WHERE id = $2 AND completed_at IS NULL
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(score)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("complete quiz attempt", "", e))?;

        match completed {
            Some(attempt) => Ok(attempt),
            None => match self.find_by_id(id).await? {
                Some(_) => Err(AppError::Conflict("Quiz attempt already submitted".to_string())),
                None => Err(AppError::NotFound("Quiz attempt not found".to_string())),
            },
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM quiz_attempts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete quiz attempt", "", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz attempt not found".to_string()));
        }
        Ok(())
    }
}

// src/repositories/answer_repository.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::answer::{Answer, NewAnswer},
    repositories::db_error,
};

#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// In the order the rows were written: batch by batch, each batch in the
    /// order it was given.
    async fn list_by_attempt(&self, attempt_id: Uuid) -> AppResult<Vec<Answer>>;
    /// One statement: either every row is written or none is.
    ///
    /// A question already answered on the attempt keeps its first answer; the
    /// new row for it is skipped. Returns only the rows written.
    async fn create_batch(&self, answers: Vec<NewAnswer>) -> AppResult<Vec<Answer>>;
    async fn count_correct(&self, attempt_id: Uuid) -> AppResult<i32>;
    /// Returns the number of rows removed.
    async fn delete_by_attempt(&self, attempt_id: Uuid) -> AppResult<u64>;
}

pub struct PgAnswerRepository {
    pool: PgPool,
}

impl PgAnswerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ANSWER_COLUMNS: &str = "id, attempt_id, question_id, selected_option, is_correct, created_at";

#[async_trait]
impl AnswerRepository for PgAnswerRepository {
    async fn list_by_attempt(&self, attempt_id: Uuid) -> AppResult<Vec<Answer>> {
        sqlx::query_as::<_, Answer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE attempt_id = $1 ORDER BY seq ASC"
        ))
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list answers", "", e))
    }

    async fn create_batch(&self, answers: Vec<NewAnswer>) -> AppResult<Vec<Answer>> {
        if answers.is_empty() {
            return Ok(Vec::new());
        }

        // Multi-row VALUES keeps the batch a single statement
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO answers (attempt_id, question_id, selected_option, is_correct) ",
        );
        builder.push_values(answers, |mut row, answer| {
            row.push_bind(answer.attempt_id)
                .push_bind(answer.question_id)
                .push_bind(answer.selected_option)
                .push_bind(answer.is_correct);
        });
        builder.push(format!(
            " ON CONFLICT (attempt_id, question_id) DO NOTHING RETURNING {ANSWER_COLUMNS}"
        ));

        builder
            .build_query_as::<Answer>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("create answers", "", e))
    }

    async fn count_correct(&self, attempt_id: Uuid) -> AppResult<i32> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE attempt_id = $1 AND is_correct = TRUE")
                .bind(attempt_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count correct answers", "", e))?;

        Ok(count as i32)
    }

    async fn delete_by_attempt(&self, attempt_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM answers WHERE attempt_id = $1")
            .bind(attempt_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete answers", "", e))?;

        Ok(result.rows_affected())
    }
}

// src/repositories/quiz_repository.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::quiz::{Quiz, QuizCreator, QuizInput, QuizUpdate},
    repositories::db_error,
};

/// Every read returns quizzes with the `creator` relation filled in.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, active_only: bool) -> AppResult<Vec<Quiz>>;
    async fn list_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Quiz>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Quiz>>;
    async fn create(&self, input: &QuizInput, created_by: Uuid) -> AppResult<Quiz>;
    async fn update(&self, id: Uuid, update: &QuizUpdate) -> AppResult<Quiz>;
    /// Touches `is_active` (and `updated_at`) only.
    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<Quiz>;
    /// Questions go with the quiz; attempts keep their snapshot.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Quiz row joined with its creator's profile.
#[derive(Debug, FromRow)]
struct QuizRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    is_active: bool,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_email: Option<String>,
    creator_first_name: Option<String>,
    creator_last_name: Option<String>,
}

impl From<QuizRow> for Quiz {
    fn from(row: QuizRow) -> Self {
        let creator = match (row.created_by, row.creator_email, row.creator_first_name, row.creator_last_name) {
            (Some(id), Some(email), Some(first_name), Some(last_name)) => Some(QuizCreator {
                id,
                email,
                first_name,
                last_name,
            }),
            _ => None,
        };

        Quiz {
            id: row.id,
            title: row.title,
            description: row.description,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            creator,
        }
    }
}

/// Select list over a source aliased `q`.
const QUIZ_SELECT: &str = r#"
    SELECT
        q.id, q.title, q.description, q.is_active, q.created_by, q.created_at, q.updated_at,
        p.email AS creator_email,
        p.first_name AS creator_first_name,
        p.last_name AS creator_last_name
"#;

fn from_joined(source: &str) -> String {
    format!("{QUIZ_SELECT} FROM {source} q LEFT JOIN profiles p ON p.id = q.created_by")
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn list(&self, active_only: bool) -> AppResult<Vec<Quiz>> {
        let filter = if active_only { " WHERE q.is_active = TRUE" } else { "" };
        let sql = format!("{}{filter} ORDER BY q.created_at DESC", from_joined("quizzes"));

        let rows = sqlx::query_as::<_, QuizRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list quizzes", "", e))?;

        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Quiz>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("{} WHERE q.id = ANY($1) ORDER BY q.created_at DESC", from_joined("quizzes"));
        let rows = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list quizzes by id", "", e))?;

        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Quiz>> {
        let sql = format!("{} WHERE q.id = $1", from_joined("quizzes"));
        let row = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch quiz", "", e))?;

        Ok(row.map(Quiz::from))
    }

    async fn create(&self, input: &QuizInput, created_by: Uuid) -> AppResult<Quiz> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO quizzes (title, description, is_active, created_by)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            {}
            "#,
            from_joined("inserted")
        );

        let row = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.is_active)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("create quiz", "Quiz already exists", e))?;

        Ok(row.into())
    }

    async fn update(&self, id: Uuid, update: &QuizUpdate) -> AppResult<Quiz> {
        let mut builder =
            QueryBuilder::<Postgres>::new("WITH updated AS (UPDATE quizzes SET updated_at = NOW()");

        if let Some(title) = &update.title {
            builder.push(", title = ").push_bind(title.trim());
        }
        if let Some(description) = &update.description {
            builder
                .push(", description = NULLIF(")
                .push_bind(description)
                .push(", '')");
        }
        if let Some(is_active) = update.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(" RETURNING *) ");
        builder.push(from_joined("updated"));

        let row = builder
            .build_query_as::<QuizRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update quiz", "", e))?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        Ok(row.into())
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<Quiz> {
        let update = QuizUpdate {
            is_active: Some(is_active),
            ..Default::default()
        };
        self.update(id, &update).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete quiz", "", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(created_by: Option<Uuid>, email: Option<&str>) -> QuizRow {
        QuizRow {
            id: Uuid::new_v4(),
            title: "Math".to_string(),
            description: None,
            is_active: true,
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            creator_email: email.map(str::to_string),
            creator_first_name: email.map(|_| "Ada".to_string()),
            creator_last_name: email.map(|_| "Lovelace".to_string()),
        }
    }

    #[test]
    fn creator_relation_is_built_from_join() {
        let creator = Uuid::new_v4();
        let quiz = Quiz::from(row(Some(creator), Some("ada@example.com")));
        let relation = quiz.creator.unwrap();
        assert_eq!(relation.id, creator);
        assert_eq!(relation.first_name, "Ada");
    }

    #[test]
    fn missing_creator_profile_leaves_relation_empty() {
        assert!(Quiz::from(row(Some(Uuid::new_v4()), None)).creator.is_none());
        assert!(Quiz::from(row(None, None)).creator.is_none());
    }

    #[test]
    fn joined_select_targets_the_given_source() {
        let sql = from_joined("updated");
        assert!(sql.contains("FROM updated q LEFT JOIN profiles p"));
    }
}

// src/repositories/mod.rs

//! Data access. One trait per table, each with a Postgres implementation and
//! an in-memory one (`memory::MemoryStore`) used for local runs and tests.

pub mod answer_repository;
pub mod identity_repository;
pub mod memory;
pub mod profile_repository;
pub mod question_repository;
pub mod quiz_attempt_repository;
pub mod quiz_repository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::{error::AppError, realtime::feed::ChangeFeed};

pub use answer_repository::{AnswerRepository, PgAnswerRepository};
pub use identity_repository::{IdentityRepository, PgIdentityRepository};
pub use memory::MemoryStore;
pub use profile_repository::{PgProfileRepository, ProfileRepository};
pub use question_repository::{PgQuestionRepository, QuestionRepository};
pub use quiz_attempt_repository::{PgQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{PgQuizRepository, QuizRepository};

/// The full set of repositories the services run on.
#[derive(Clone)]
pub struct Repositories {
    pub identities: Arc<dyn IdentityRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub answers: Arc<dyn AnswerRepository>,
}

impl Repositories {
    /// Postgres-backed. Change events come from the database triggers.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            identities: Arc::new(PgIdentityRepository::new(pool.clone())),
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            quizzes: Arc::new(PgQuizRepository::new(pool.clone())),
            questions: Arc::new(PgQuestionRepository::new(pool.clone())),
            attempts: Arc::new(PgQuizAttemptRepository::new(pool.clone())),
            answers: Arc::new(PgAnswerRepository::new(pool)),
        }
    }

    /// In-memory. The store publishes its own change events on `feed`.
    pub fn memory(feed: ChangeFeed) -> Self {
        Self::from_store(Arc::new(MemoryStore::new(feed)))
    }

    pub fn from_store(store: Arc<MemoryStore>) -> Self {
        Self {
            identities: store.clone(),
            profiles: store.clone(),
            quizzes: store.clone(),
            questions: store.clone(),
            attempts: store.clone(),
            answers: store,
        }
    }
}

/// Maps a database error, logging it with the failing operation.
/// Unique violations (Postgres code 23505) become `Conflict(conflict)`.
pub(crate) fn db_error(operation: &str, conflict: &str, e: sqlx::Error) -> AppError {
    if matches!(e, sqlx::Error::RowNotFound) {
        return AppError::from(e);
    }
    if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
        return AppError::Conflict(conflict.to_string());
    }
    tracing::error!("Failed to {}: {:?}", operation, e);
    AppError::InternalServerError(e.to_string())
}

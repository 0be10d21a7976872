// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'answers' table. Immutable once written.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_option: String,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

/// Row written by the batch insert at submission time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_option: String,
    pub is_correct: bool,
}

impl NewAnswer {
    /// Correctness is settled here, before the write.
    pub fn new(
        attempt_id: Uuid,
        question_id: Uuid,
        selected_option: String,
        correct_option: &str,
    ) -> Self {
        let is_correct = selected_option == correct_option;
        Self {
            attempt_id,
            question_id,
            selected_option,
            is_correct,
        }
    }
}

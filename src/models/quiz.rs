// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::not_blank;

/// Represents the 'quizzes' table.
///
/// `creator` is the expanded `created_by` relation. It is filled by fetches
/// and left empty in realtime row images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<QuizCreator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizCreator {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

fn default_active() -> bool {
    true
}

/// DTO for creating a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizInput {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = not_blank)
    )]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// DTO for editing a quiz. Fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct QuizUpdate {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = not_blank)
    )]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub is_active: Option<bool>,
}

impl QuizUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_active.is_none()
    }
}

/// Body of the dedicated activation toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusChange {
    pub is_active: bool,
}

/// Result of the activation toggle: the refreshed quiz plus the advisory
/// question-count check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationOutcome {
    pub quiz: Quiz,
    pub question_count: usize,
    pub minimum_questions: usize,
    pub meets_minimum: bool,
}

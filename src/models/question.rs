// src/models/question.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::{AppError, AppResult},
    models::validation::{not_blank, valid_identifier, validate_options},
};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,

    /// Owning quiz.
    pub quiz_id: Uuid,

    pub question_text: String,

    /// Ordered answer options (2 to 10).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Always one of `options`.
    pub correct_answer: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for sending a question to a student (excludes the correct answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            question_text: question.question_text.clone(),
            options: question.options.0.clone(),
        }
    }
}

/// Questions of one quiz as the caller's role may see them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionView {
    Full(Vec<Question>),
    Public(Vec<PublicQuestion>),
}

impl QuestionView {
    pub fn len(&self) -> usize {
        match self {
            QuestionView::Full(questions) => questions.len(),
            QuestionView::Public(questions) => questions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// DTO for creating a question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(custom(function = valid_identifier))]
    pub quiz_id: String,

    #[validate(length(max = 2000), custom(function = not_blank))]
    pub question_text: String,

    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    #[validate(custom(function = not_blank))]
    pub correct_answer: String,
}

/// A question payload that passed validation, ready for the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub quiz_id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuestionInput {
    /// Runs the field rules plus the cross-field rule (correct answer must be
    /// one of the options, reported against `correct_answer`).
    pub fn check(&self) -> AppResult<QuestionDraft> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let answer_present = !self.correct_answer.trim().is_empty();
        if answer_present && !self.options.iter().any(|o| o == &self.correct_answer) {
            let err = ValidationError::new("not_in_options").with_message(Cow::Borrowed(
                "Correct answer must be one of the options",
            ));
            errors.add("correct_answer", err);
        }

        if !errors.errors().is_empty() {
            return Err(errors.into());
        }

        // valid_identifier already accepted the id
        let quiz_id = Uuid::parse_str(self.quiz_id.trim())
            .map_err(|e| AppError::BadRequest(format!("Invalid quiz id: {e}")))?;

        Ok(QuestionDraft {
            quiz_id,
            question_text: self.question_text.trim().to_string(),
            options: self.options.clone(),
            correct_answer: self.correct_answer.clone(),
        })
    }
}

/// DTO for editing a question. Merged with the stored row before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionUpdate {
    pub question_text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
}

impl QuestionUpdate {
    pub fn merge(self, existing: &Question) -> QuestionInput {
        QuestionInput {
            quiz_id: existing.quiz_id.to_string(),
            question_text: self
                .question_text
                .unwrap_or_else(|| existing.question_text.clone()),
            options: self.options.unwrap_or_else(|| existing.options.0.clone()),
            correct_answer: self
                .correct_answer
                .unwrap_or_else(|| existing.correct_answer.clone()),
        }
    }
}

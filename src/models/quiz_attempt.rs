// src/models/quiz_attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

use crate::models::{
    answer::Answer,
    profile::Profile,
    question::{PublicQuestion, Question},
    quiz::Quiz,
};

/// Represents the 'quiz_attempts' table.
///
/// `score` and `completed_at` are written once, at submission.
/// `snapshot_quiz` is written once, at creation.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,

    /// Absent from realtime row images (payload size).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_quiz: Option<Json<QuizSnapshot>>,
}

impl QuizAttempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn snapshot(&self) -> Option<&QuizSnapshot> {
        self.snapshot_quiz.as_ref().map(|json| &json.0)
    }

    /// Copy without the frozen quiz; what a student sees before grading.
    pub fn without_snapshot(&self) -> Self {
        Self {
            snapshot_quiz: None,
            ..self.clone()
        }
    }
}

/// Deep copy of a quiz and its questions, frozen when the attempt starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSnapshot {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub questions: Vec<SnapshotQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuizSnapshot {
    pub fn capture(quiz: &Quiz, questions: &[Question]) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            is_active: quiz.is_active,
            created_by: quiz.created_by,
            questions: questions
                .iter()
                .map(|q| SnapshotQuestion {
                    id: q.id,
                    question_text: q.question_text.clone(),
                    options: q.options.0.clone(),
                    correct_answer: q.correct_answer.clone(),
                })
                .collect(),
        }
    }

    pub fn question(&self, id: Uuid) -> Option<&SnapshotQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn public_questions(&self) -> Vec<PublicQuestion> {
        self.questions
            .iter()
            .map(|q| PublicQuestion {
                id: q.id,
                quiz_id: self.id,
                question_text: q.question_text.clone(),
                options: q.options.clone(),
            })
            .collect()
    }
}

/// Row written when a student starts an attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub snapshot: QuizSnapshot,
}

/// Response to starting an attempt: the attempt (without answer key) and the
/// frozen questions to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedAttempt {
    pub attempt: QuizAttempt,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for submitting an attempt.
/// Key: question id. Value: the selected option.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: BTreeMap<Uuid, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub attempt: QuizAttempt,
    pub score: i32,
    pub total_questions: usize,
}

/// Query parameters for the results list.
#[derive(Debug, Default, Deserialize)]
pub struct AttemptListParams {
    pub quiz_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// One snapshot question with the answer recorded for it, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptItem {
    pub question: SnapshotQuestion,
    pub answer: Option<Answer>,
}

/// Everything the results-detail screen renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub attempt: QuizAttempt,
    pub profile: Profile,
    pub items: Vec<AttemptItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz() -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Math".to_string(),
            description: None,
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            creator: None,
        }
    }

    fn question(quiz_id: Uuid, text: &str, correct: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id,
            question_text: text.to_string(),
            options: Json(vec!["A".to_string(), "B".to_string()]),
            correct_answer: correct.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_is_a_deep_copy() {
        let quiz = quiz();
        let mut questions = vec![question(quiz.id, "q1", "A"), question(quiz.id, "q2", "B")];
        let snapshot = QuizSnapshot::capture(&quiz, &questions);

        questions[0].question_text = "edited".to_string();
        questions[0].options.0.push("C".to_string());

        assert_eq!(snapshot.questions.len(), 2);
        assert_eq!(snapshot.questions[0].question_text, "q1");
        assert_eq!(snapshot.questions[0].options, vec!["A", "B"]);
        assert_eq!(snapshot.questions[1].correct_answer, "B");
    }

    #[test]
    fn public_questions_drop_answer_key() {
        let quiz = quiz();
        let snapshot = QuizSnapshot::capture(&quiz, &[question(quiz.id, "q1", "A")]);
        let public = snapshot.public_questions();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].quiz_id, quiz.id);
        let json = serde_json::to_value(&public[0]).unwrap();
        assert!(json.get("correct_answer").is_none());
    }

    #[test]
    fn attempt_row_image_without_snapshot_deserializes() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "quiz_id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "started_at": "2025-10-15T09:30:00+00:00",
            "completed_at": null,
            "score": null
        });
        let attempt: QuizAttempt = serde_json::from_value(json).unwrap();
        assert!(attempt.snapshot().is_none());
        assert!(!attempt.is_completed());
    }
}

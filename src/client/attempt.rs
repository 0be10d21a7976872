// src/client/attempt.rs

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    client::api::QuizApi,
    error::{AppError, AppResult},
    models::{
        question::PublicQuestion,
        quiz_attempt::{QuizAttempt, SubmissionResult, SubmitAttemptRequest},
    },
};

/// State of the quiz-taking page between start and submission.
#[derive(Debug, Clone)]
pub struct AttemptSession {
    attempt: QuizAttempt,
    questions: Vec<PublicQuestion>,
    answers: BTreeMap<Uuid, String>,
    result: Option<SubmissionResult>,
}

impl AttemptSession {
    /// Starts a server-side attempt; the questions are the frozen copy.
    pub async fn start(api: &dyn QuizApi, token: &str, quiz_id: Uuid) -> AppResult<Self> {
        let started = api.start_attempt(token, quiz_id).await?;
        Ok(Self {
            attempt: started.attempt,
            questions: started.questions,
            answers: BTreeMap::new(),
            result: None,
        })
    }

    pub fn attempt(&self) -> &QuizAttempt {
        &self.attempt
    }

    pub fn questions(&self) -> &[PublicQuestion] {
        &self.questions
    }

    pub fn answer(&self, question_id: Uuid) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    /// `(answered, total)`
    pub fn progress(&self) -> (usize, usize) {
        (self.answers.len(), self.questions.len())
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    /// Records a choice; picking again replaces it.
    pub fn select(&mut self, question_id: Uuid, option: &str) -> AppResult<()> {
        if self.result.is_some() {
            return Err(AppError::Conflict("Quiz attempt already submitted".to_string()));
        }
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question not found: {question_id}")))?;
        if !question.options.iter().any(|o| o == option) {
            return Err(AppError::BadRequest(format!("'{option}' is not an option of this question")));
        }
        self.answers.insert(question_id, option.to_string());
        Ok(())
    }

    pub async fn submit(&mut self, api: &dyn QuizApi, token: &str) -> AppResult<&SubmissionResult> {
        if self.result.is_some() {
            return Err(AppError::Conflict("Quiz attempt already submitted".to_string()));
        }
        if self.answers.is_empty() {
            return Err(AppError::BadRequest("Please answer at least one question".to_string()));
        }

        let request = SubmitAttemptRequest {
            answers: self.answers.clone(),
        };
        let result = api.submit_attempt(token, self.attempt.id, &request).await?;
        self.attempt = result.attempt.clone();
        Ok(self.result.insert(result))
    }
}

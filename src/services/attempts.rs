// src/services/attempts.rs

//! Taking a quiz: start (snapshot), submit (answers, score, completion),
//! results and deletion.

use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        answer::NewAnswer,
        quiz_attempt::{
            AttemptDetail, AttemptItem, AttemptListParams, NewAttempt, QuizAttempt, QuizSnapshot,
            StartedAttempt, SubmissionResult, SubmitAttemptRequest,
        },
    },
    repositories::{
        AnswerRepository, ProfileRepository, QuestionRepository, QuizAttemptRepository,
        QuizRepository, Repositories,
    },
    utils::jwt::Actor,
};

#[derive(Clone)]
pub struct AttemptService {
    attempts: Arc<dyn QuizAttemptRepository>,
    answers: Arc<dyn AnswerRepository>,
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl AttemptService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            attempts: repos.attempts.clone(),
            answers: repos.answers.clone(),
            quizzes: repos.quizzes.clone(),
            questions: repos.questions.clone(),
            profiles: repos.profiles.clone(),
        }
    }

    /// Results list. Students are pinned to their own attempts.
    /// Snapshots are left out of list rows.
    pub async fn list(&self, actor: &Actor, mut params: AttemptListParams) -> AppResult<Vec<QuizAttempt>> {
        if !actor.is_admin() {
            match params.user_id {
                Some(user_id) if user_id != actor.user_id => {
                    return Err(AppError::Forbidden(
                        "Students can only list their own attempts".to_string(),
                    ));
                }
                _ => params.user_id = Some(actor.user_id),
            }
        }

        let attempts = self.attempts.list(&params).await?;
        Ok(attempts.iter().map(QuizAttempt::without_snapshot).collect())
    }

    /// Single attempt. The owner sees the snapshot once the attempt is graded.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<QuizAttempt> {
        let attempt = self.find_owned(actor, id).await?;
        if actor.is_admin() || attempt.is_completed() {
            Ok(attempt)
        } else {
            Ok(attempt.without_snapshot())
        }
    }

    /// Freezes the quiz and its questions into a new attempt.
    ///
    /// Both reads happen before the insert; if either fails nothing is written.
    pub async fn start(&self, actor: &Actor, quiz_id: Uuid) -> AppResult<StartedAttempt> {
        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .filter(|quiz| quiz.is_active || actor.is_admin())
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        let questions = self.questions.list_by_quiz(quiz.id).await?;
        let snapshot = QuizSnapshot::capture(&quiz, &questions);
        let public = snapshot.public_questions();

        let attempt = self
            .attempts
            .create(NewAttempt {
                quiz_id: quiz.id,
                user_id: actor.user_id,
                snapshot,
            })
            .await?;

        tracing::info!(
            attempt = %attempt.id,
            quiz = %quiz.id,
            user = %actor.user_id,
            questions = public.len(),
            "Quiz attempt started"
        );

        Ok(StartedAttempt {
            attempt: attempt.without_snapshot(),
            questions: public,
        })
    }

    /// Records the answers, computes the score and completes the attempt.
    ///
    /// Correctness is judged against the snapshot taken at start, so later
    /// edits to the live questions do not change the outcome. The three
    /// writes are separate: once the answers are stored, a failure in a
    /// later step is reported as a `PartialFailure`.
    ///
    /// The attempt stays open after a partial failure and may be submitted
    /// again. Questions answered by the earlier try keep that answer, so the
    /// score never counts a question twice.
    pub async fn submit(
        &self,
        actor: &Actor,
        id: Uuid,
        request: SubmitAttemptRequest,
    ) -> AppResult<SubmissionResult> {
        let attempt = self.find_owned(actor, id).await?;

        if attempt.is_completed() {
            return Err(AppError::Conflict("Quiz attempt already submitted".to_string()));
        }
        if request.answers.is_empty() {
            return Err(AppError::BadRequest("Please answer at least one question".to_string()));
        }

        let snapshot = attempt
            .snapshot()
            .ok_or_else(|| AppError::Invariant("Quiz snapshot missing".to_string()))?;

        let mut selections = request.answers;
        if let Some(unknown) = selections.keys().find(|id| snapshot.question(**id).is_none()) {
            return Err(AppError::Invariant(format!("Question not found: {unknown}")));
        }

        // Written in quiz order
        let rows: Vec<NewAnswer> = snapshot
            .questions
            .iter()
            .filter_map(|question| {
                selections.remove(&question.id).map(|selected| {
                    NewAnswer::new(attempt.id, question.id, selected, &question.correct_answer)
                })
            })
            .collect();
        let total_questions = snapshot.questions.len();

        self.answers.create_batch(rows).await?;

        let score = self.answers.count_correct(attempt.id).await.map_err(|e| {
            tracing::error!(attempt = %attempt.id, "Scoring failed after answers were saved: {}", e);
            AppError::partial(&["answers"], "score", e)
        })?;

        let completed = self.attempts.complete(attempt.id, score).await.map_err(|e| {
            tracing::error!(attempt = %attempt.id, "Completing attempt failed after answers were saved: {}", e);
            AppError::partial(&["answers"], "attempt", e)
        })?;

        tracing::info!(
            attempt = %completed.id,
            user = %actor.user_id,
            "Quiz attempt submitted: {}/{}",
            score,
            total_questions
        );

        Ok(SubmissionResult {
            attempt: completed,
            score,
            total_questions,
        })
    }

    /// Attempt, attempting profile and each snapshot question with its answer.
    pub async fn detail(&self, actor: &Actor, id: Uuid) -> AppResult<AttemptDetail> {
        let attempt = self.find_owned(actor, id).await?;

        if !actor.is_admin() && !attempt.is_completed() {
            return Err(AppError::Forbidden(
                "Results are available after submission".to_string(),
            ));
        }

        let (profile, answers) = tokio::try_join!(
            self.profiles.find_by_id(attempt.user_id),
            self.answers.list_by_attempt(attempt.id),
        )?;

        let profile =
            profile.ok_or_else(|| AppError::Invariant("User profile not found".to_string()))?;
        let snapshot = attempt
            .snapshot()
            .ok_or_else(|| AppError::Invariant("Quiz snapshot missing".to_string()))?;

        let mut by_question: HashMap<Uuid, _> =
            answers.into_iter().map(|a| (a.question_id, a)).collect();
        let items = snapshot
            .questions
            .iter()
            .map(|question| AttemptItem {
                question: question.clone(),
                answer: by_question.remove(&question.id),
            })
            .collect();

        Ok(AttemptDetail {
            attempt,
            profile,
            items,
        })
    }

    /// Deletes the answers, then the attempt. Admin only.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;

        if self.attempts.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Quiz attempt not found".to_string()));
        }

        let removed = self.answers.delete_by_attempt(id).await?;

        self.attempts.delete(id).await.map_err(|e| {
            tracing::error!(attempt = %id, "Deleting attempt failed after its answers were removed: {}", e);
            AppError::partial(&["answers"], "attempt", e)
        })?;

        tracing::info!(attempt = %id, answers = removed, by = %actor.user_id, "Quiz attempt deleted");
        Ok(())
    }

    async fn find_owned(&self, actor: &Actor, id: Uuid) -> AppResult<QuizAttempt> {
        let attempt = self
            .attempts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz attempt not found".to_string()))?;
        actor.require_self_or_admin(attempt.user_id)?;
        Ok(attempt)
    }
}

// src/client/board.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::{
    client::{api::QuizApi, inflight::InFlight},
    error::{AppError, AppResult},
    models::quiz::{ActivationOutcome, Quiz},
    realtime::{
        ChangeEvent,
        reconcile::{Change, InsertPosition, LiveCollection},
    },
};

/// The quiz list screen: a live list plus the per-row activation toggle.
pub struct QuizBoard {
    api: Arc<dyn QuizApi>,
    quizzes: Mutex<LiveCollection<Quiz>>,
    toggling: InFlight<Uuid>,
}

impl QuizBoard {
    pub fn new(api: Arc<dyn QuizApi>, quizzes: Vec<Quiz>) -> Self {
        Self {
            api,
            quizzes: Mutex::new(LiveCollection::new(quizzes, InsertPosition::Front)),
            toggling: InFlight::new(),
        }
    }

    pub fn quizzes(&self) -> Vec<Quiz> {
        self.list().items().to_vec()
    }

    pub fn is_toggling(&self, id: Uuid) -> bool {
        self.toggling.is_busy(&id)
    }

    /// Folds a realtime event into the list.
    pub fn apply_event(&self, event: &ChangeEvent) -> AppResult<bool> {
        self.list().apply_event(event)
    }

    /// Flips `is_active` of one quiz.
    ///
    /// Returns `Ok(None)` without calling the API when a toggle for the same
    /// quiz is still running.
    pub async fn toggle_active(&self, token: &str, id: Uuid) -> AppResult<Option<ActivationOutcome>> {
        let Some(_token) = self.toggling.try_begin(id) else {
            return Ok(None);
        };

        let current = self
            .list()
            .get(id)
            .map(|quiz| quiz.is_active)
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        let outcome = self.api.set_quiz_active(token, id, !current).await?;
        if !outcome.meets_minimum && outcome.quiz.is_active {
            tracing::warn!(
                quiz = %id,
                questions = outcome.question_count,
                minimum = outcome.minimum_questions,
                "Quiz is active with fewer questions than recommended"
            );
        }
        self.list().apply(Change::Update(outcome.quiz.clone()));
        Ok(Some(outcome))
    }

    fn list(&self) -> MutexGuard<'_, LiveCollection<Quiz>> {
        self.quizzes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use super::*;
    use crate::{
        models::quiz_attempt::{StartedAttempt, SubmissionResult, SubmitAttemptRequest},
        realtime::Table,
    };

    fn quiz(is_active: bool) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Math".into(),
            description: None,
            is_active,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            creator: None,
        }
    }

    /// Blocks `set_quiz_active` until released.
    struct SlowApi {
        quiz: Quiz,
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuizApi for SlowApi {
        async fn set_quiz_active(&self, _: &str, _: Uuid, is_active: bool) -> AppResult<ActivationOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(ActivationOutcome {
                quiz: Quiz {
                    is_active,
                    ..self.quiz.clone()
                },
                question_count: 5,
                minimum_questions: 5,
                meets_minimum: true,
            })
        }

        async fn start_attempt(&self, _: &str, _: Uuid) -> AppResult<StartedAttempt> {
            Err(AppError::InternalServerError("not used".into()))
        }

        async fn submit_attempt(&self, _: &str, _: Uuid, _: &SubmitAttemptRequest) -> AppResult<SubmissionResult> {
            Err(AppError::InternalServerError("not used".into()))
        }
    }

    #[tokio::test]
    async fn second_toggle_while_in_flight_is_a_no_op() {
        let initial = quiz(true);
        let api = Arc::new(SlowApi {
            quiz: initial.clone(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let board = Arc::new(QuizBoard::new(api.clone(), vec![initial.clone()]));

        let first = tokio::spawn({
            let board = board.clone();
            async move { board.toggle_active("t", initial.id).await }
        });
        while api.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(board.is_toggling(initial.id));

        assert!(board.toggle_active("t", initial.id).await.unwrap().is_none());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);

        api.release.notify_one();
        let outcome = first.await.unwrap().unwrap().unwrap();
        assert!(!outcome.quiz.is_active);
        assert!(!board.is_toggling(initial.id));
        assert!(!board.quizzes()[0].is_active);
    }

    #[test]
    fn realtime_insert_lands_on_top() {
        let api = Arc::new(SlowApi {
            quiz: quiz(true),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let board = QuizBoard::new(api, vec![quiz(true)]);
        let fresh = quiz(true);
        board
            .apply_event(&ChangeEvent::insert(Table::Quizzes, &fresh))
            .unwrap();
        let quizzes = board.quizzes();
        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[0].id, fresh.id);
    }
}

// src/services/test_support.rs

//! Fixtures and fault-injecting repository wrappers for service tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        answer::{Answer, NewAnswer},
        auth::{RegisterRequest, Role},
        profile::{NewProfile, Profile, ProfileUpdate},
        question::{Question, QuestionDraft},
        quiz::{Quiz, QuizInput, QuizUpdate},
        quiz_attempt::{AttemptListParams, NewAttempt, QuizAttempt},
    },
    realtime::feed::ChangeFeed,
    repositories::{
        AnswerRepository, MemoryStore, ProfileRepository, QuestionRepository, QuizAttemptRepository,
        QuizRepository, Repositories,
    },
    utils::jwt::Actor,
};

pub fn repositories() -> (Repositories, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(ChangeFeed::new(256)));
    (Repositories::from_store(store.clone()), store)
}

pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "password123".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        phone: None,
    }
}

/// Creates a profile row and returns an actor for it.
pub async fn actor(repos: &Repositories, role: Role) -> Actor {
    let id = Uuid::new_v4();
    repos
        .profiles
        .create(NewProfile {
            id,
            email: format!("{id}@example.com"),
            first_name: "Test".to_string(),
            last_name: format!("{role:?}"),
            phone: None,
            is_admin: role.is_admin(),
        })
        .await
        .unwrap();
    Actor::new(id, Uuid::new_v4(), role)
}

/// A quiz with one question per `(text, correct)` pair. Options are A, B, C.
pub async fn quiz_with_questions(
    repos: &Repositories,
    created_by: Uuid,
    questions: &[(&str, &str)],
) -> (Quiz, Vec<Question>) {
    let quiz = repos
        .quizzes
        .create(
            &QuizInput {
                title: "General knowledge".to_string(),
                description: None,
                is_active: true,
            },
            created_by,
        )
        .await
        .unwrap();

    let mut created = Vec::new();
    for (text, correct) in questions {
        let draft = QuestionDraft {
            quiz_id: quiz.id,
            question_text: text.to_string(),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            correct_answer: correct.to_string(),
        };
        created.push(repos.questions.create(&draft).await.unwrap());
    }
    (quiz, created)
}

fn injected(step: &str) -> AppError {
    AppError::InternalServerError(format!("injected failure: {step}"))
}

/// Profile store that rejects every call.
pub struct FailingProfiles;

#[async_trait]
impl ProfileRepository for FailingProfiles {
    async fn list(&self, _: bool) -> AppResult<Vec<Profile>> {
        Err(injected("list profiles"))
    }
    async fn list_by_ids(&self, _: &[Uuid]) -> AppResult<Vec<Profile>> {
        Err(injected("list profiles"))
    }
    async fn find_by_id(&self, _: Uuid) -> AppResult<Option<Profile>> {
        Err(injected("find profile"))
    }
    async fn find_by_email(&self, _: &str) -> AppResult<Option<Profile>> {
        Err(injected("find profile"))
    }
    async fn create(&self, _: NewProfile) -> AppResult<Profile> {
        Err(injected("create profile"))
    }
    async fn update(&self, _: Uuid, _: &ProfileUpdate) -> AppResult<Profile> {
        Err(injected("update profile"))
    }
    async fn delete(&self, _: Uuid) -> AppResult<()> {
        Err(injected("delete profile"))
    }
}

/// Wraps an answer store; each flag makes the matching call fail.
#[derive(Default)]
pub struct AnswerFaults {
    pub create_batch: AtomicBool,
    pub count_correct: AtomicBool,
    pub delete_by_attempt: AtomicBool,
    pub calls: AtomicUsize,
}

pub struct FlakyAnswers {
    pub inner: Arc<dyn AnswerRepository>,
    pub faults: Arc<AnswerFaults>,
}

#[async_trait]
impl AnswerRepository for FlakyAnswers {
    async fn list_by_attempt(&self, attempt_id: Uuid) -> AppResult<Vec<Answer>> {
        self.inner.list_by_attempt(attempt_id).await
    }

    async fn create_batch(&self, answers: Vec<NewAnswer>) -> AppResult<Vec<Answer>> {
        self.faults.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.create_batch.load(Ordering::SeqCst) {
            return Err(injected("create answers"));
        }
        self.inner.create_batch(answers).await
    }

    async fn count_correct(&self, attempt_id: Uuid) -> AppResult<i32> {
        if self.faults.count_correct.load(Ordering::SeqCst) {
            return Err(injected("count correct answers"));
        }
        self.inner.count_correct(attempt_id).await
    }

    async fn delete_by_attempt(&self, attempt_id: Uuid) -> AppResult<u64> {
        self.faults.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.delete_by_attempt.load(Ordering::SeqCst) {
            return Err(injected("delete answers"));
        }
        self.inner.delete_by_attempt(attempt_id).await
    }
}

#[derive(Default)]
pub struct AttemptFaults {
    pub complete: AtomicBool,
    pub delete: AtomicBool,
    pub create: AtomicBool,
}

pub struct FlakyAttempts {
    pub inner: Arc<dyn QuizAttemptRepository>,
    pub faults: Arc<AttemptFaults>,
}

#[async_trait]
impl QuizAttemptRepository for FlakyAttempts {
    async fn list(&self, params: &AttemptListParams) -> AppResult<Vec<QuizAttempt>> {
        self.inner.list(params).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QuizAttempt>> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, attempt: NewAttempt) -> AppResult<QuizAttempt> {
        if self.faults.create.load(Ordering::SeqCst) {
            return Err(injected("create attempt"));
        }
        self.inner.create(attempt).await
    }

    async fn complete(&self, id: Uuid, score: i32) -> AppResult<QuizAttempt> {
        if self.faults.complete.load(Ordering::SeqCst) {
            return Err(injected("complete attempt"));
        }
        self.inner.complete(id, score).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        if self.faults.delete.load(Ordering::SeqCst) {
            return Err(injected("delete attempt"));
        }
        self.inner.delete(id).await
    }
}

/// Question store whose reads fail; used to check that nothing is written
/// when a start-attempt read fails.
pub struct FailingQuestionReads {
    pub inner: Arc<dyn QuestionRepository>,
}

#[async_trait]
impl QuestionRepository for FailingQuestionReads {
    async fn list(&self) -> AppResult<Vec<Question>> {
        Err(injected("list questions"))
    }
    async fn list_by_quiz(&self, _: Uuid) -> AppResult<Vec<Question>> {
        Err(injected("list questions"))
    }
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Question>> {
        self.inner.find_by_id(id).await
    }
    async fn count_by_quiz(&self, quiz_id: Uuid) -> AppResult<usize> {
        self.inner.count_by_quiz(quiz_id).await
    }
    async fn create(&self, draft: &QuestionDraft) -> AppResult<Question> {
        self.inner.create(draft).await
    }
    async fn update(&self, id: Uuid, draft: &QuestionDraft) -> AppResult<Question> {
        self.inner.update(id, draft).await
    }
    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.inner.delete(id).await
    }
}

/// Quiz lookups always fail.
pub struct FailingQuizReads {
    pub inner: Arc<dyn QuizRepository>,
}

#[async_trait]
impl QuizRepository for FailingQuizReads {
    async fn list(&self, _: bool) -> AppResult<Vec<Quiz>> {
        Err(injected("list quizzes"))
    }
    async fn list_by_ids(&self, _: &[Uuid]) -> AppResult<Vec<Quiz>> {
        Err(injected("list quizzes"))
    }
    async fn find_by_id(&self, _: Uuid) -> AppResult<Option<Quiz>> {
        Err(injected("fetch quiz"))
    }
    async fn create(&self, input: &QuizInput, created_by: Uuid) -> AppResult<Quiz> {
        self.inner.create(input, created_by).await
    }
    async fn update(&self, id: Uuid, update: &QuizUpdate) -> AppResult<Quiz> {
        self.inner.update(id, update).await
    }
    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<Quiz> {
        self.inner.set_active(id, is_active).await
    }
    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.inner.delete(id).await
    }
}

// src/repositories/memory.rs

//! In-memory backend. Mirrors the Postgres schema rules that matter to the
//! services (unique emails, question -> quiz cascade, answer -> attempt
//! reference without cascade) and publishes the same change events the
//! database triggers do.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        answer::{Answer, NewAnswer},
        auth::{Identity, SessionRecord},
        profile::{NewProfile, Profile, ProfileUpdate},
        question::{Question, QuestionDraft},
        quiz::{Quiz, QuizCreator, QuizInput, QuizUpdate},
        quiz_attempt::{AttemptListParams, NewAttempt, QuizAttempt},
    },
    realtime::{ChangeEvent, Table, feed::ChangeFeed},
    repositories::{
        AnswerRepository, IdentityRepository, ProfileRepository, QuestionRepository,
        QuizAttemptRepository, QuizRepository,
    },
};

/// Rows are kept in insertion order; "newest first" reads iterate backwards.
#[derive(Default)]
struct Tables {
    identities: Vec<Identity>,
    sessions: Vec<SessionRecord>,
    profiles: Vec<Profile>,
    quizzes: Vec<Quiz>,
    questions: Vec<Question>,
    attempts: Vec<QuizAttempt>,
    answers: Vec<Answer>,
}

impl Tables {
    fn with_creator(&self, quiz: &Quiz) -> Quiz {
        let creator = quiz
            .created_by
            .and_then(|id| self.profiles.iter().find(|p| p.id == id))
            .map(|p| QuizCreator {
                id: p.id,
                email: p.email.clone(),
                first_name: p.first_name.clone(),
                last_name: p.last_name.clone(),
            });
        Quiz {
            creator,
            ..quiz.clone()
        }
    }
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            feed,
        }
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn create(&self, email: &str, password_hash: &str, metadata: Value) -> AppResult<Identity> {
        let mut tables = self.tables.write().await;
        if tables.identities.iter().any(|i| same_email(&i.email, email)) {
            return Err(AppError::Conflict(format!("Email '{email}' is already registered")));
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            metadata: Json(metadata),
            created_at: Utc::now(),
        };
        tables.identities.push(identity.clone());
        Ok(identity)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables.identities.iter().find(|i| same_email(&i.email, email)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Identity>> {
        let tables = self.tables.read().await;
        Ok(tables.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn create_session(&self, identity_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<SessionRecord> {
        let mut tables = self.tables.write().await;
        if !tables.identities.iter().any(|i| i.id == identity_id) {
            return Err(AppError::NotFound("Identity not found".to_string()));
        }

        let session = SessionRecord {
            id: Uuid::new_v4(),
            identity_id,
            created_at: Utc::now(),
            expires_at,
            revoked_at: None,
        };
        tables.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<SessionRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn revoke_session(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.sessions.iter_mut().find(|s| s.id == id) {
            session.revoked_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn list(&self, exclude_admins: bool) -> AppResult<Vec<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .rev()
            .filter(|p| !(exclude_admins && p.is_admin))
            .cloned()
            .collect())
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .rev()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| same_email(&p.email, email)).cloned())
    }

    async fn create(&self, profile: NewProfile) -> AppResult<Profile> {
        let mut tables = self.tables.write().await;
        if tables
            .profiles
            .iter()
            .any(|p| p.id == profile.id || same_email(&p.email, &profile.email))
        {
            return Err(AppError::Conflict(format!(
                "Profile for '{}' already exists",
                profile.email
            )));
        }

        let now = Utc::now();
        let row = Profile {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone: profile.phone,
            avatar_url: None,
            is_admin: profile.is_admin,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.push(row.clone());
        self.feed.publish(ChangeEvent::insert(Table::Profiles, &row));
        Ok(row)
    }

    async fn update(&self, id: Uuid, update: &ProfileUpdate) -> AppResult<Profile> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &update.email {
            if tables.profiles.iter().any(|p| p.id != id && same_email(&p.email, email)) {
                return Err(AppError::Conflict("Email is already in use".to_string()));
            }
        }

        let row = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        let old = row.clone();

        if let Some(email) = &update.email {
            row.email = email.clone();
        }
        if let Some(first_name) = &update.first_name {
            row.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &update.last_name {
            row.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = &update.phone {
            row.phone = Some(phone.clone());
        }
        if let Some(avatar_url) = &update.avatar_url {
            row.avatar_url = Some(avatar_url.clone());
        }
        if let Some(is_admin) = update.is_admin {
            row.is_admin = is_admin;
        }
        row.updated_at = Utc::now();

        let row = row.clone();
        self.feed.publish(ChangeEvent::update(Table::Profiles, &old, &row));
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        let row = tables.profiles.remove(index);

        // quizzes.created_by is ON DELETE SET NULL
        let mut orphaned = Vec::new();
        for quiz in tables.quizzes.iter_mut().filter(|q| q.created_by == Some(id)) {
            let old = quiz.clone();
            quiz.created_by = None;
            orphaned.push((old, quiz.clone()));
        }

        self.feed.publish(ChangeEvent::delete(Table::Profiles, &row));
        for (old, new) in orphaned {
            self.feed.publish(ChangeEvent::update(Table::Quizzes, &old, &new));
        }
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn list(&self, active_only: bool) -> AppResult<Vec<Quiz>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quizzes
            .iter()
            .rev()
            .filter(|q| !active_only || q.is_active)
            .map(|q| tables.with_creator(q))
            .collect())
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Quiz>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quizzes
            .iter()
            .rev()
            .filter(|q| ids.contains(&q.id))
            .map(|q| tables.with_creator(q))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Quiz>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quizzes
            .iter()
            .find(|q| q.id == id)
            .map(|q| tables.with_creator(q)))
    }

    async fn create(&self, input: &QuizInput, created_by: Uuid) -> AppResult<Quiz> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let quiz = Quiz {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: input.description.clone(),
            is_active: input.is_active,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
            creator: None,
        };
        tables.quizzes.push(quiz.clone());
        self.feed.publish(ChangeEvent::insert(Table::Quizzes, &quiz));
        Ok(tables.with_creator(&quiz))
    }

    async fn update(&self, id: Uuid, update: &QuizUpdate) -> AppResult<Quiz> {
        let mut tables = self.tables.write().await;
        let quiz = tables
            .quizzes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
        let old = quiz.clone();

        if let Some(title) = &update.title {
            quiz.title = title.trim().to_string();
        }
        if let Some(description) = &update.description {
            quiz.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(is_active) = update.is_active {
            quiz.is_active = is_active;
        }
        quiz.updated_at = Utc::now();

        let quiz = quiz.clone();
        self.feed.publish(ChangeEvent::update(Table::Quizzes, &old, &quiz));
        Ok(tables.with_creator(&quiz))
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<Quiz> {
        let update = QuizUpdate {
            is_active: Some(is_active),
            ..Default::default()
        };
        QuizRepository::update(self, id, &update).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .quizzes
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
        let quiz = tables.quizzes.remove(index);

        let (removed, kept): (Vec<Question>, Vec<Question>) =
            tables.questions.drain(..).partition(|q| q.quiz_id == id);
        tables.questions = kept;

        for question in &removed {
            self.feed.publish(ChangeEvent::delete(Table::Questions, question));
        }
        self.feed.publish(ChangeEvent::delete(Table::Quizzes, &quiz));
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().rev().cloned().collect())
    }

    async fn list_by_quiz(&self, quiz_id: Uuid) -> AppResult<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .rev()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn count_by_quiz(&self, quiz_id: Uuid) -> AppResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().filter(|q| q.quiz_id == quiz_id).count())
    }

    async fn create(&self, draft: &QuestionDraft) -> AppResult<Question> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.iter().any(|q| q.id == draft.quiz_id) {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let now = Utc::now();
        let question = Question {
            id: Uuid::new_v4(),
            quiz_id: draft.quiz_id,
            question_text: draft.question_text.clone(),
            options: Json(draft.options.clone()),
            correct_answer: draft.correct_answer.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.questions.push(question.clone());
        self.feed.publish(ChangeEvent::insert(Table::Questions, &question));
        Ok(question)
    }

    async fn update(&self, id: Uuid, draft: &QuestionDraft) -> AppResult<Question> {
        let mut tables = self.tables.write().await;
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
        let old = question.clone();

        question.question_text = draft.question_text.clone();
        question.options = Json(draft.options.clone());
        question.correct_answer = draft.correct_answer.clone();
        question.updated_at = Utc::now();

        let question = question.clone();
        self.feed.publish(ChangeEvent::update(Table::Questions, &old, &question));
        Ok(question)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .questions
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
        let question = tables.questions.remove(index);
        self.feed.publish(ChangeEvent::delete(Table::Questions, &question));
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for MemoryStore {
    async fn list(&self, params: &AttemptListParams) -> AppResult<Vec<QuizAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .rev()
            .filter(|a| params.quiz_id.is_none_or(|id| a.quiz_id == id))
            .filter(|a| params.user_id.is_none_or(|id| a.user_id == id))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QuizAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables.attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn create(&self, attempt: NewAttempt) -> AppResult<QuizAttempt> {
        let mut tables = self.tables.write().await;
        let row = QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            started_at: Utc::now(),
            completed_at: None,
            score: None,
            snapshot_quiz: Some(Json(attempt.snapshot)),
        };
        tables.attempts.push(row.clone());
        self.feed.publish(ChangeEvent::insert(Table::QuizAttempts, &row));
        Ok(row)
    }

    async fn complete(&self, id: Uuid, score: i32) -> AppResult<QuizAttempt> {
        let mut tables = self.tables.write().await;
        let attempt = tables
            .attempts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::NotFound("Quiz attempt not found".to_string()))?;
        if attempt.is_completed() {
            return Err(AppError::Conflict("Quiz attempt already submitted".to_string()));
        }
        let old = attempt.clone();

        attempt.score = Some(score);
        attempt.completed_at = Some(Utc::now());

        let attempt = attempt.clone();
        self.feed.publish(ChangeEvent::update(Table::QuizAttempts, &old, &attempt));
        Ok(attempt)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables
            .attempts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| AppError::NotFound("Quiz attempt not found".to_string()))?;

        // answers.attempt_id references the attempt without cascade
        if tables.answers.iter().any(|a| a.attempt_id == id) {
            return Err(AppError::InternalServerError(
                "update or delete on table \"quiz_attempts\" violates foreign key constraint on table \"answers\""
                    .to_string(),
            ));
        }

        let attempt = tables.attempts.remove(index);
        self.feed.publish(ChangeEvent::delete(Table::QuizAttempts, &attempt));
        Ok(())
    }
}

#[async_trait]
impl AnswerRepository for MemoryStore {
    async fn list_by_attempt(&self, attempt_id: Uuid) -> AppResult<Vec<Answer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn create_batch(&self, answers: Vec<NewAnswer>) -> AppResult<Vec<Answer>> {
        let mut tables = self.tables.write().await;
        if let Some(missing) = answers
            .iter()
            .find(|a| !tables.attempts.iter().any(|attempt| attempt.id == a.attempt_id))
        {
            return Err(AppError::NotFound(format!(
                "Quiz attempt not found: {}",
                missing.attempt_id
            )));
        }

        let now = Utc::now();
        let mut rows: Vec<Answer> = Vec::with_capacity(answers.len());
        for a in answers {
            let taken = |row: &Answer| row.attempt_id == a.attempt_id && row.question_id == a.question_id;
            if tables.answers.iter().any(taken) || rows.iter().any(taken) {
                continue;
            }
            rows.push(Answer {
                id: Uuid::new_v4(),
                attempt_id: a.attempt_id,
                question_id: a.question_id,
                selected_option: a.selected_option,
                is_correct: a.is_correct,
                created_at: now,
            });
        }

        tables.answers.extend(rows.iter().cloned());
        for row in &rows {
            self.feed.publish(ChangeEvent::insert(Table::Answers, row));
        }
        Ok(rows)
    }

    async fn count_correct(&self, attempt_id: Uuid) -> AppResult<i32> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id && a.is_correct)
            .count() as i32)
    }

    async fn delete_by_attempt(&self, attempt_id: Uuid) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let (removed, kept): (Vec<Answer>, Vec<Answer>) =
            tables.answers.drain(..).partition(|a| a.attempt_id == attempt_id);
        tables.answers = kept;

        for answer in &removed {
            self.feed.publish(ChangeEvent::delete(Table::Answers, answer));
        }
        Ok(removed.len() as u64)
    }
}

// src/client/api.rs

//! Typed HTTP client for the quizdesk API.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{
    Stream, StreamExt,
    stream::{self, BoxStream},
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ErrorBody},
    models::{
        auth::{AuthSession, LoginRequest, RegisterRequest, Role, SessionInfo},
        profile::{Profile, ProfileUpdate},
        question::{Question, QuestionInput, QuestionUpdate, QuestionView},
        quiz::{ActivationOutcome, Quiz, QuizInput, QuizUpdate, StatusChange},
        quiz_attempt::{
            AttemptDetail, AttemptListParams, QuizAttempt, StartedAttempt, SubmissionResult,
            SubmitAttemptRequest,
        },
    },
    realtime::{ChangeEvent, Filter, Table},
};

/// Sign-in, sign-out and sign-up against the auth endpoints.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, request: &LoginRequest) -> AppResult<AuthSession>;
    async fn sign_out(&self, token: &str) -> AppResult<()>;
    /// `admin_token` is required to create an admin.
    async fn register(
        &self,
        request: &RegisterRequest,
        role: Role,
        admin_token: Option<&str>,
    ) -> AppResult<Profile>;
    async fn session_info(&self, token: &str) -> AppResult<SessionInfo>;
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, token: &str, user_id: Uuid) -> AppResult<Profile>;
}

/// The calls the quiz board and the attempt page make.
#[async_trait]
pub trait QuizApi: Send + Sync {
    async fn set_quiz_active(&self, token: &str, quiz_id: Uuid, is_active: bool) -> AppResult<ActivationOutcome>;
    async fn start_attempt(&self, token: &str, quiz_id: Uuid) -> AppResult<StartedAttempt>;
    async fn submit_attempt(
        &self,
        token: &str,
        attempt_id: Uuid,
        request: &SubmitAttemptRequest,
    ) -> AppResult<SubmissionResult>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url) -> Self {
        Self {
            http: Client::new(),
            base,
        }
    }

    fn url(&self, path: &str) -> AppResult<Url> {
        self.base
            .join(path)
            .map_err(|e| AppError::Transport(format!("Invalid request path {path}: {e}")))
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> AppResult<RequestBuilder> {
        let builder = self.http.request(method, self.url(path)?);
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> AppResult<()> {
        check(builder.send().await?).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, token: &str, path: &str) -> AppResult<T> {
        self.send(self.request(Method::GET, path, Some(token))?).await
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        token: Option<&str>,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        self.send(self.request(method, path, token)?.json(body)).await
    }

    async fn delete(&self, token: &str, path: &str) -> AppResult<()> {
        self.send_empty(self.request(Method::DELETE, path, Some(token))?).await
    }

    // Profiles

    pub async fn list_profiles(&self, token: &str, exclude_admins: bool) -> AppResult<Vec<Profile>> {
        self.get(token, &format!("/api/profiles?exclude_admins={exclude_admins}")).await
    }

    pub async fn profiles_by_ids(&self, token: &str, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        self.get(token, &format!("/api/profiles?ids={}", join_ids(ids))).await
    }

    pub async fn update_profile(&self, token: &str, id: Uuid, update: &ProfileUpdate) -> AppResult<Profile> {
        self.write(Method::PUT, Some(token), &format!("/api/profiles/{id}"), update).await
    }

    pub async fn delete_profile(&self, token: &str, id: Uuid) -> AppResult<()> {
        self.delete(token, &format!("/api/profiles/{id}")).await
    }

    // Quizzes

    pub async fn list_quizzes(&self, token: &str) -> AppResult<Vec<Quiz>> {
        self.get(token, "/api/quizzes").await
    }

    pub async fn quizzes_by_ids(&self, token: &str, ids: &[Uuid]) -> AppResult<Vec<Quiz>> {
        self.get(token, &format!("/api/quizzes?ids={}", join_ids(ids))).await
    }

    pub async fn get_quiz(&self, token: &str, id: Uuid) -> AppResult<Quiz> {
        self.get(token, &format!("/api/quizzes/{id}")).await
    }

    pub async fn create_quiz(&self, token: &str, input: &QuizInput) -> AppResult<Quiz> {
        self.write(Method::POST, Some(token), "/api/quizzes", input).await
    }

    pub async fn update_quiz(&self, token: &str, id: Uuid, update: &QuizUpdate) -> AppResult<Quiz> {
        self.write(Method::PUT, Some(token), &format!("/api/quizzes/{id}"), update).await
    }

    pub async fn delete_quiz(&self, token: &str, id: Uuid) -> AppResult<()> {
        self.delete(token, &format!("/api/quizzes/{id}")).await
    }

    pub async fn quiz_questions(&self, token: &str, quiz_id: Uuid) -> AppResult<QuestionView> {
        self.get(token, &format!("/api/quizzes/{quiz_id}/questions")).await
    }

    // Questions

    pub async fn list_questions(&self, token: &str) -> AppResult<Vec<Question>> {
        self.get(token, "/api/questions").await
    }

    pub async fn create_question(&self, token: &str, input: &QuestionInput) -> AppResult<Question> {
        self.write(Method::POST, Some(token), "/api/questions", input).await
    }

    pub async fn update_question(&self, token: &str, id: Uuid, update: &QuestionUpdate) -> AppResult<Question> {
        self.write(Method::PUT, Some(token), &format!("/api/questions/{id}"), update).await
    }

    pub async fn delete_question(&self, token: &str, id: Uuid) -> AppResult<()> {
        self.delete(token, &format!("/api/questions/{id}")).await
    }

    // Attempts

    pub async fn list_attempts(&self, token: &str, params: &AttemptListParams) -> AppResult<Vec<QuizAttempt>> {
        let builder = self.request(Method::GET, "/api/attempts", Some(token))?;
        let mut query = Vec::new();
        if let Some(quiz_id) = params.quiz_id {
            query.push(("quiz_id", quiz_id));
        }
        if let Some(user_id) = params.user_id {
            query.push(("user_id", user_id));
        }
        self.send(builder.query(&query)).await
    }

    pub async fn attempt_detail(&self, token: &str, id: Uuid) -> AppResult<AttemptDetail> {
        self.get(token, &format!("/api/attempts/{id}")).await
    }

    pub async fn delete_attempt(&self, token: &str, id: Uuid) -> AppResult<()> {
        self.delete(token, &format!("/api/attempts/{id}")).await
    }

    // Realtime

    /// Opens the change stream of one table. Dropping the stream closes the
    /// subscription.
    pub async fn subscribe(
        &self,
        token: &str,
        table: Table,
        filter: Option<&Filter>,
    ) -> AppResult<BoxStream<'static, AppResult<ChangeEvent>>> {
        let mut builder = self.request(Method::GET, &format!("/api/realtime/{table}"), Some(token))?;
        if let Some(filter) = filter {
            builder = builder.query(&[("filter", filter.to_string())]);
        }
        let response = check(builder.send().await?).await?;
        Ok(change_events(Box::pin(response.bytes_stream())).boxed())
    }
}

#[async_trait]
impl AuthProvider for ApiClient {
    async fn sign_in(&self, request: &LoginRequest) -> AppResult<AuthSession> {
        self.write(Method::POST, None, "/api/auth/login", request).await
    }

    async fn sign_out(&self, token: &str) -> AppResult<()> {
        self.send_empty(self.request(Method::POST, "/api/auth/logout", Some(token))?).await
    }

    async fn register(
        &self,
        request: &RegisterRequest,
        role: Role,
        admin_token: Option<&str>,
    ) -> AppResult<Profile> {
        match role {
            Role::Student => self.write(Method::POST, None, "/api/auth/register", request).await,
            Role::Admin => {
                let token = admin_token
                    .ok_or_else(|| AppError::AuthError("Admin session required".to_string()))?;
                self.write(Method::POST, Some(token), "/api/auth/register/admin", request)
                    .await
            }
        }
    }

    async fn session_info(&self, token: &str) -> AppResult<SessionInfo> {
        self.get(token, "/api/auth/session").await
    }
}

#[async_trait]
impl ProfileSource for ApiClient {
    async fn fetch_profile(&self, token: &str, user_id: Uuid) -> AppResult<Profile> {
        self.get(token, &format!("/api/profiles/{user_id}")).await
    }
}

#[async_trait]
impl QuizApi for ApiClient {
    async fn set_quiz_active(&self, token: &str, quiz_id: Uuid, is_active: bool) -> AppResult<ActivationOutcome> {
        let body = StatusChange { is_active };
        self.write(Method::PATCH, Some(token), &format!("/api/quizzes/{quiz_id}/status"), &body)
            .await
    }

    async fn start_attempt(&self, token: &str, quiz_id: Uuid) -> AppResult<StartedAttempt> {
        self.write(Method::POST, Some(token), &format!("/api/quizzes/{quiz_id}/attempts"), &())
            .await
    }

    async fn submit_attempt(
        &self,
        token: &str,
        attempt_id: Uuid,
        request: &SubmitAttemptRequest,
    ) -> AppResult<SubmissionResult> {
        self.write(Method::POST, Some(token), &format!("/api/attempts/{attempt_id}/submit"), request)
            .await
    }
}

/// Maps non-2xx responses back to `AppError`, keeping the server's message.
async fn check(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
        error: if text.is_empty() {
            status.to_string()
        } else {
            text
        },
        fields: None,
        partial: None,
    });

    Err(AppError::from_response(status, body))
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
}

/// One Server-Sent Event, before its data is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental `text/event-stream` parser. Feed it chunks as they arrive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut messages = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..end + 2).collect();
            if let Some(message) = parse_block(&block) {
                messages.push(message);
            }
        }
        messages
    }
}

fn parse_block(block: &str) -> Option<SseMessage> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        // Lines starting with ':' are comments (keep-alives).
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }
    Some(SseMessage {
        event,
        data: data.join("\n"),
    })
}

fn change_events<S, B, E>(bytes: S) -> impl Stream<Item = AppResult<ChangeEvent>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<AppError> + Send,
{
    let state = (bytes, SseDecoder::default(), VecDeque::<SseMessage>::new());
    stream::unfold(state, |(mut bytes, mut decoder, mut pending)| async move {
        loop {
            if let Some(message) = pending.pop_front() {
                let event = serde_json::from_str::<ChangeEvent>(&message.data).map_err(AppError::from);
                return Some((event, (bytes, decoder, pending)));
            }
            match bytes.next().await {
                Some(Ok(chunk)) => pending.extend(decoder.push(chunk.as_ref())),
                Some(Err(e)) => return Some((Err(e.into()), (bytes, decoder, pending))),
                None => return None,
            }
        }
    })
}

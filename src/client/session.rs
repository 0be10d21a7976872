// src/client/session.rs

//! Client-side session state: anonymous or authenticated, plus a loading flag.
//! Consumers watch transitions through `subscribe()`.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::{
    client::{
        api::AuthProvider,
        persist::{SESSION_KEY, StateFile},
    },
    error::{AppError, AppResult},
    models::{
        auth::{AuthSession, LoginRequest, RegisterRequest, Role},
        profile::Profile,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated(AuthSession),
}

/// What caused the latest transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The persisted session was checked at start-up (present or not).
    InitialSession,
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub loading: bool,
    pub last_event: Option<SessionEvent>,
}

impl SessionSnapshot {
    pub fn session(&self) -> Option<&AuthSession> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }
}

pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    persist: Option<StateFile>,
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthProvider>, persist: Option<StateFile>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot {
            state: SessionState::Anonymous,
            loading: true,
            last_event: None,
        });
        Self { auth, persist, tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.tx.borrow().session().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().session().map(|s| s.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().session().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    /// Re-validates the persisted session, then emits `InitialSession`.
    ///
    /// A session the server no longer accepts is dropped from disk. Transport
    /// errors leave the file alone so the next start can retry.
    pub async fn restore(&self) -> AppResult<Option<AuthSession>> {
        self.set_loading(true);

        let stored = match &self.persist {
            Some(file) => file.get::<AuthSession>(SESSION_KEY).await.unwrap_or_else(|e| {
                tracing::warn!("Could not read persisted session: {}", e);
                None
            }),
            None => None,
        };

        let Some(session) = stored.filter(|s| !s.is_expired(Utc::now())) else {
            self.forget().await;
            self.transition(SessionState::Anonymous, SessionEvent::InitialSession);
            return Ok(None);
        };

        match self.auth.session_info(&session.access_token).await {
            Ok(_) => {
                self.transition(
                    SessionState::Authenticated(session.clone()),
                    SessionEvent::InitialSession,
                );
                Ok(Some(session))
            }
            Err(AppError::AuthError(_)) => {
                self.forget().await;
                self.transition(SessionState::Anonymous, SessionEvent::InitialSession);
                Ok(None)
            }
            Err(e) => {
                self.transition(SessionState::Anonymous, SessionEvent::InitialSession);
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, request: &LoginRequest) -> AppResult<AuthSession> {
        self.set_loading(true);

        let session = match self.auth.sign_in(request).await {
            Ok(session) => session,
            Err(e) => {
                self.set_loading(false);
                return Err(e);
            }
        };

        if let Some(file) = &self.persist {
            if let Err(e) = file.set(SESSION_KEY, &session).await {
                tracing::warn!("Could not persist session: {}", e);
            }
        }

        self.transition(SessionState::Authenticated(session.clone()), SessionEvent::SignedIn);
        Ok(session)
    }

    /// Revokes the remote session, then clears local state. Local state is
    /// cleared even when the remote call fails.
    pub async fn sign_out(&self) -> AppResult<()> {
        self.set_loading(true);

        let remote = match self.token() {
            Some(token) => self.auth.sign_out(&token).await,
            None => Ok(()),
        };
        if let Err(e) = &remote {
            tracing::warn!("Remote sign-out failed, clearing local session anyway: {}", e);
        }

        self.forget().await;
        self.transition(SessionState::Anonymous, SessionEvent::SignedOut);
        remote
    }

    /// Creates an account. Admin accounts need a signed-in admin.
    ///
    /// Does not change the current session.
    pub async fn register(&self, request: &RegisterRequest, role: Role) -> AppResult<Profile> {
        let admin_token = match role {
            Role::Admin => Some(
                self.token()
                    .ok_or_else(|| AppError::AuthError("Sign in as an admin first".to_string()))?,
            ),
            Role::Student => None,
        };
        self.auth.register(request, role, admin_token.as_deref()).await
    }

    async fn forget(&self) {
        if let Some(file) = &self.persist {
            if let Err(e) = file.remove(SESSION_KEY).await {
                tracing::warn!("Could not clear persisted session: {}", e);
            }
        }
    }

    fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|snapshot| snapshot.loading = loading);
    }

    fn transition(&self, state: SessionState, event: SessionEvent) {
        self.tx.send_replace(SessionSnapshot {
            state,
            loading: false,
            last_event: Some(event),
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::models::auth::SessionInfo;

    /// Accepts `password123` for any email and tracks revoked tokens.
    #[derive(Default)]
    pub(crate) struct FakeAuth {
        pub revoked: Mutex<Vec<String>>,
        pub fail_sign_out: bool,
        pub offline: bool,
    }

    pub(crate) fn session_for(user_id: Uuid, role: Role) -> AuthSession {
        AuthSession {
            access_token: format!("token-{user_id}"),
            token_type: "Bearer".into(),
            user_id,
            session_id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            role,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[async_trait]
    impl AuthProvider for FakeAuth {
        async fn sign_in(&self, request: &LoginRequest) -> AppResult<AuthSession> {
            if request.password != "password123" {
                return Err(AppError::AuthError("Invalid email or password".into()));
            }
            Ok(session_for(Uuid::new_v4(), Role::Student))
        }

        async fn sign_out(&self, token: &str) -> AppResult<()> {
            if self.fail_sign_out {
                return Err(AppError::Transport("offline".into()));
            }
            self.revoked.lock().unwrap().push(token.to_string());
            Ok(())
        }

        async fn register(&self, _: &RegisterRequest, _: Role, _: Option<&str>) -> AppResult<Profile> {
            Err(AppError::InternalServerError("not used".into()))
        }

        async fn session_info(&self, token: &str) -> AppResult<SessionInfo> {
            if self.offline {
                return Err(AppError::Transport("offline".into()));
            }
            if self.revoked.lock().unwrap().iter().any(|t| t == token) {
                return Err(AppError::AuthError("Session expired or signed out".into()));
            }
            Ok(SessionInfo {
                user_id: Uuid::new_v4(),
                session_id: Uuid::new_v4(),
                role: Role::Student,
                expires_at: Utc::now() + Duration::hours(1),
            })
        }
    }

    fn login(password: &str) -> LoginRequest {
        LoginRequest {
            email: "ada@example.com".into(),
            password: password.into(),
        }
    }

    fn temp_file() -> StateFile {
        StateFile::new(std::env::temp_dir().join(format!("quizdesk-session-{}.json", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn sign_in_then_out_emits_transitions() {
        let auth = Arc::new(FakeAuth::default());
        let store = SessionStore::new(auth.clone(), None);
        let mut rx = store.subscribe();
        assert!(store.is_loading());

        store.sign_in(&login("password123")).await.unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.last_event, Some(SessionEvent::SignedIn));
        assert!(!snapshot.loading);
        assert!(store.is_authenticated());

        let token = store.token().unwrap();
        store.sign_out().await.unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(store.snapshot().last_event, Some(SessionEvent::SignedOut));
        assert_eq!(auth.revoked.lock().unwrap().as_slice(), &[token]);
    }

    #[tokio::test]
    async fn failed_sign_in_stays_anonymous() {
        let store = SessionStore::new(Arc::new(FakeAuth::default()), None);
        let err = store.sign_in(&login("wrong-password")).await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
        assert!(!store.is_authenticated());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn sign_out_clears_locally_even_if_remote_fails() {
        let auth = Arc::new(FakeAuth {
            fail_sign_out: true,
            ..Default::default()
        });
        let store = SessionStore::new(auth, None);
        store.sign_in(&login("password123")).await.unwrap();

        assert!(store.sign_out().await.is_err());
        assert!(!store.is_authenticated());
        assert_eq!(store.snapshot().last_event, Some(SessionEvent::SignedOut));
    }

    #[tokio::test]
    async fn restore_revalidates_persisted_session() {
        let file = temp_file();
        let auth = Arc::new(FakeAuth::default());

        let first = SessionStore::new(auth.clone(), Some(file.clone()));
        let session = first.sign_in(&login("password123")).await.unwrap();

        let second = SessionStore::new(auth.clone(), Some(file.clone()));
        let restored = second.restore().await.unwrap();
        assert_eq!(restored.map(|s| s.session_id), Some(session.session_id));
        assert_eq!(second.snapshot().last_event, Some(SessionEvent::InitialSession));
        assert!(second.is_authenticated());

        // Revoked elsewhere: the next start comes up anonymous and forgets it.
        auth.revoked.lock().unwrap().push(session.access_token.clone());
        let third = SessionStore::new(auth, Some(file.clone()));
        assert!(third.restore().await.unwrap().is_none());
        assert!(!third.is_authenticated());
        assert!(file.get::<AuthSession>(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_keeps_file_when_offline() {
        let file = temp_file();
        let online = SessionStore::new(Arc::new(FakeAuth::default()), Some(file.clone()));
        online.sign_in(&login("password123")).await.unwrap();

        let offline = Arc::new(FakeAuth {
            offline: true,
            ..Default::default()
        });
        let store = SessionStore::new(offline, Some(file.clone()));
        assert!(matches!(store.restore().await, Err(AppError::Transport(_))));
        assert!(!store.is_authenticated());
        assert!(file.get::<AuthSession>(SESSION_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_registration_needs_a_session() {
        let store = SessionStore::new(Arc::new(FakeAuth::default()), None);
        let request = RegisterRequest {
            email: "new@example.com".into(),
            password: "password123".into(),
            first_name: "New".into(),
            last_name: "Admin".into(),
            phone: None,
        };
        assert!(matches!(
            store.register(&request, Role::Admin).await,
            Err(AppError::AuthError(_))
        ));
    }
}

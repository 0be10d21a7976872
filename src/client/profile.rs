// src/client/profile.rs

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use uuid::Uuid;

use crate::{
    client::{
        api::ProfileSource,
        persist::{PROFILE_KEY, StateFile},
        session::{SessionEvent, SessionSnapshot},
    },
    error::AppResult,
    models::profile::Profile,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState {
    pub profile: Option<Profile>,
    pub loading: bool,
}

/// The signed-in user's profile. Knows nothing about sessions; see
/// [`sync_profile`] for the wiring.
pub struct ProfileStore {
    source: Arc<dyn ProfileSource>,
    persist: Option<StateFile>,
    tx: watch::Sender<ProfileState>,
}

impl ProfileStore {
    pub fn new(source: Arc<dyn ProfileSource>, persist: Option<StateFile>) -> Self {
        let (tx, _rx) = watch::channel(ProfileState::default());
        Self { source, persist, tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.tx.subscribe()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.tx.borrow().profile.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.tx.borrow().profile.as_ref().is_some_and(|p| p.is_admin)
    }

    pub async fn set_profile(&self, profile: Profile) {
        self.save(Some(&profile)).await;
        self.tx.send_replace(ProfileState {
            profile: Some(profile),
            loading: false,
        });
    }

    /// Loads the row from the backend. A missing row or a backend error is
    /// returned as is and leaves the current profile in place.
    pub async fn fetch_profile(&self, token: &str, user_id: Uuid) -> AppResult<Profile> {
        self.tx.send_modify(|state| state.loading = true);
        match self.source.fetch_profile(token, user_id).await {
            Ok(profile) => {
                self.set_profile(profile.clone()).await;
                Ok(profile)
            }
            Err(e) => {
                self.tx.send_modify(|state| state.loading = false);
                Err(e)
            }
        }
    }

    pub async fn clear(&self) {
        self.save(None).await;
        self.tx.send_replace(ProfileState::default());
    }

    /// Reacts to one session transition: sign-in or start-up loads the
    /// profile, sign-out clears it.
    pub async fn on_session(&self, snapshot: &SessionSnapshot) -> AppResult<()> {
        match (snapshot.last_event, snapshot.session()) {
            (Some(SessionEvent::SignedIn | SessionEvent::InitialSession), Some(session)) => {
                self.fetch_profile(&session.access_token, session.user_id).await?;
            }
            (Some(_), _) => self.clear().await,
            (None, _) => {}
        }
        Ok(())
    }

    async fn save(&self, profile: Option<&Profile>) {
        let Some(file) = &self.persist else {
            return;
        };
        let result = match profile {
            Some(profile) => file.set(PROFILE_KEY, profile).await,
            None => file.remove(PROFILE_KEY).await,
        };
        if let Err(e) = result {
            tracing::warn!("Could not persist profile: {}", e);
        }
    }
}

/// Keeps `profiles` in step with the session store until the session store
/// is dropped.
pub fn sync_profile(
    mut sessions: watch::Receiver<SessionSnapshot>,
    profiles: Arc<ProfileStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let snapshot = sessions.borrow_and_update().clone();
            if let Err(e) = profiles.on_session(&snapshot).await {
                tracing::warn!("Failed to load profile: {}", e);
            }
            if sessions.changed().await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::{
        client::session::{SessionState, tests::session_for},
        error::AppError,
        models::auth::Role,
    };

    #[derive(Default)]
    struct FakeProfiles {
        calls: AtomicUsize,
    }

    fn profile(id: Uuid, is_admin: bool) -> Profile {
        Profile {
            id,
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
            avatar_url: None,
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[async_trait]
    impl ProfileSource for FakeProfiles {
        async fn fetch_profile(&self, _token: &str, user_id: Uuid) -> AppResult<Profile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if user_id.is_nil() {
                return Err(AppError::NotFound("Profile not found".into()));
            }
            Ok(profile(user_id, true))
        }
    }

    fn snapshot(state: SessionState, event: SessionEvent) -> SessionSnapshot {
        SessionSnapshot {
            state,
            loading: false,
            last_event: Some(event),
        }
    }

    #[tokio::test]
    async fn sign_in_loads_and_sign_out_clears() {
        let store = ProfileStore::new(Arc::new(FakeProfiles::default()), None);
        let session = session_for(Uuid::new_v4(), Role::Admin);

        store
            .on_session(&snapshot(SessionState::Authenticated(session.clone()), SessionEvent::SignedIn))
            .await
            .unwrap();
        assert_eq!(store.profile().map(|p| p.id), Some(session.user_id));
        assert!(store.is_admin());

        store
            .on_session(&snapshot(SessionState::Anonymous, SessionEvent::SignedOut))
            .await
            .unwrap();
        assert!(store.profile().is_none());
        assert!(!store.is_admin());
    }

    #[tokio::test]
    async fn sign_out_clears_even_with_a_session_in_the_snapshot() {
        let store = ProfileStore::new(Arc::new(FakeProfiles::default()), None);
        let session = session_for(Uuid::new_v4(), Role::Student);
        let signed_in = SessionState::Authenticated(session.clone());

        store
            .on_session(&snapshot(signed_in.clone(), SessionEvent::SignedIn))
            .await
            .unwrap();
        assert!(store.profile().is_some());

        store
            .on_session(&snapshot(signed_in, SessionEvent::SignedOut))
            .await
            .unwrap();
        assert!(store.profile().is_none());
    }

    #[tokio::test]
    async fn missing_row_is_an_error() {
        let store = ProfileStore::new(Arc::new(FakeProfiles::default()), None);
        let err = store.fetch_profile("t", Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!store.subscribe().borrow().loading);
    }

    #[tokio::test]
    async fn sync_task_follows_session_changes() {
        let source = Arc::new(FakeProfiles::default());
        let store = Arc::new(ProfileStore::new(source.clone(), None));
        let (tx, rx) = watch::channel(snapshot(SessionState::Anonymous, SessionEvent::InitialSession));
        let mut profiles = store.subscribe();
        let task = sync_profile(rx, store.clone());

        let session = session_for(Uuid::new_v4(), Role::Student);
        tx.send_replace(snapshot(SessionState::Authenticated(session.clone()), SessionEvent::SignedIn));
        profiles
            .wait_for(|state| state.profile.is_some())
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        drop(tx);
        task.await.unwrap();
    }
}

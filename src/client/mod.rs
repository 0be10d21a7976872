// src/client/mod.rs

//! Front-end state for quizdesk: the session and profile stores, page routing
//! rules, per-row in-flight guards, the attempt page and the live quiz board.
//! Everything talks to the API through [`api::ApiClient`].

pub mod api;
pub mod attempt;
pub mod board;
pub mod guard;
pub mod inflight;
pub mod persist;
pub mod profile;
pub mod session;

use std::sync::Arc;

use crate::config::ClientConfig;

pub use api::ApiClient;
pub use profile::{ProfileStore, sync_profile};
pub use session::SessionStore;

/// The stores a client application starts with, wired to one API client.
pub struct ClientApp {
    pub api: Arc<ApiClient>,
    pub session: SessionStore,
    pub profile: Arc<ProfileStore>,
}

impl ClientApp {
    pub fn new(config: &ClientConfig) -> Self {
        let api = Arc::new(ApiClient::new(config.api_url.clone()));
        let file = persist::StateFile::new(config.state_file.clone());
        Self {
            session: SessionStore::new(api.clone(), Some(file.clone())),
            profile: Arc::new(ProfileStore::new(api.clone(), Some(file))),
            api,
        }
    }

    /// Restores the persisted session and keeps the profile in step with it.
    pub async fn start(&self) -> tokio::task::JoinHandle<()> {
        let sync = sync_profile(self.session.subscribe(), self.profile.clone());
        if let Err(e) = self.session.restore().await {
            tracing::warn!("Could not restore session: {}", e);
        }
        sync
    }
}

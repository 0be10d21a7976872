// src/state.rs

use axum::extract::FromRef;

use crate::{
    config::Config, realtime::feed::ChangeFeed, repositories::Repositories, services::Services,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub services: Services,
    pub feed: ChangeFeed,
}

impl AppState {
    pub fn new(config: Config, repos: &Repositories, feed: ChangeFeed) -> Self {
        let services = Services::new(repos, &config);
        Self {
            config,
            services,
            feed,
        }
    }

    /// Fully in-memory state: storage and change feed live in the process.
    pub fn in_memory(config: Config) -> Self {
        let feed = ChangeFeed::new(config.realtime_capacity);
        let repos = Repositories::memory(feed.clone());
        Self::new(config, &repos, feed)
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Services {
    fn from_ref(state: &AppState) -> Self {
        state.services.clone()
    }
}

impl FromRef<AppState> for ChangeFeed {
    fn from_ref(state: &AppState) -> Self {
        state.feed.clone()
    }
}

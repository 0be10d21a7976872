// src/client/persist.rs

use std::{path::PathBuf, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

pub const SESSION_KEY: &str = "user-session";
pub const PROFILE_KEY: &str = "user-profile";

/// Small JSON key/value file for client state that survives restarts.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        match entries.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.write(&entries).await
    }

    pub async fn remove(&self, key: &str) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        if entries.remove(key).is_some() {
            self.write(&entries).await?;
        }
        Ok(())
    }

    async fn read(&self) -> AppResult<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), "Discarding unreadable state file: {}", e);
                    Ok(Map::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(io_error(e)),
        }
    }

    /// Writes to a sibling temp file, then renames over the target.
    async fn write(&self, entries: &Map<String, Value>) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let tmp = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tokio::fs::write(&tmp, bytes).await.map_err(io_error)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_error)
    }
}

fn io_error(err: std::io::Error) -> AppError {
    AppError::InternalServerError(format!("State file error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Remembered {
        token: String,
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quizdesk-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn values_survive_a_new_handle() {
        let path = temp_path("persist");
        let file = StateFile::new(&path);
        let value = Remembered { token: "abc".into() };
        file.set(SESSION_KEY, &value).await.unwrap();
        file.set(PROFILE_KEY, &serde_json::json!({"id": 1})).await.unwrap();

        let reopened = StateFile::new(&path);
        assert_eq!(reopened.get::<Remembered>(SESSION_KEY).await.unwrap(), Some(value));

        reopened.remove(SESSION_KEY).await.unwrap();
        assert_eq!(reopened.get::<Remembered>(SESSION_KEY).await.unwrap(), None);
        assert!(reopened.get::<Value>(PROFILE_KEY).await.unwrap().is_some());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_reads_as_empty() {
        let path = temp_path("corrupt");
        let file = StateFile::new(&path);
        assert_eq!(file.get::<Value>(SESSION_KEY).await.unwrap(), None);

        std::fs::write(&path, b"{not json").unwrap();
        assert_eq!(file.get::<Value>(SESSION_KEY).await.unwrap(), None);
        let _ = std::fs::remove_file(path);
    }
}

//! File-based Session Store Adapter
//!
//! Keeps every live game in a single YAML file. A save writes a sibling
//! temporary file and renames it over the previous snapshot, so a crash
//! mid-write leaves the last complete snapshot in place.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::foundation::GameId;
use crate::domain::game::Game;
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, games: &HashMap<GameId, Game>) -> Result<(), SessionStoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| SessionStoreError::IoError(e.to_string()))?;
        }

        let yaml = serde_yaml::to_string(games)
            .map_err(|e| SessionStoreError::SerializationFailed(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, yaml)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;

        tracing::trace!(path = %self.path.display(), games = games.len(), "snapshot written");
        Ok(())
    }

    async fn load(&self) -> Result<Option<HashMap<GameId, Game>>, SessionStoreError> {
        let yaml = match fs::read_to_string(&self.path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionStoreError::IoError(e.to_string())),
        };

        let games = serde_yaml::from_str(&yaml)
            .map_err(|e| SessionStoreError::DeserializationFailed(e.to_string()))?;
        Ok(Some(games))
    }
}

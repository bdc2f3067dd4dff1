//! Snapshot persistence configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// File holding the saved games
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,

    /// How long an ended game stays in the registry
    #[serde(default = "default_ended_retention_secs")]
    pub ended_retention_secs: u64,
}

impl PersistenceConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn ended_retention(&self) -> Duration {
        Duration::from_secs(self.ended_retention_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("persistence.snapshot_path"));
        }
        if self.save_interval_secs == 0 {
            return Err(ValidationError::ZeroInterval("persistence.save_interval_secs"));
        }
        Ok(())
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            save_interval_secs: default_save_interval_secs(),
            ended_retention_secs: default_ended_retention_secs(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("saved_games.yaml")
}

fn default_save_interval_secs() -> u64 {
    5
}

fn default_ended_retention_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_save_interval_is_rejected() {
        let config = PersistenceConfig {
            save_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! AutosaveService - periodic snapshot of every live game.
//!
//! Each cycle evicts ended games past their retention, then writes all
//! remaining games to the session store in one replace-the-file save.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `save_interval` | 5s | Time between two snapshots |
//! | `ended_retention` | 10min | How long an ended game stays reachable |
//!
//! ## Failures
//!
//! A failed save is logged and the next cycle simply tries again with a
//! fresher snapshot. On shutdown one final snapshot is written.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::router::ServerDispatcher;
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    pub save_interval: Duration,
    pub ended_retention: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            save_interval: Duration::from_secs(5),
            ended_retention: Duration::from_secs(600),
        }
    }
}

impl AutosaveConfig {
    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn with_ended_retention(mut self, retention: Duration) -> Self {
        self.ended_retention = retention;
        self
    }
}

pub struct AutosaveService {
    dispatcher: ServerDispatcher,
    store: Arc<dyn SessionStore>,
    config: AutosaveConfig,
}

impl AutosaveService {
    pub fn new(dispatcher: ServerDispatcher, store: Arc<dyn SessionStore>) -> Self {
        Self::with_config(dispatcher, store, AutosaveConfig::default())
    }

    pub fn with_config(
        dispatcher: ServerDispatcher,
        store: Arc<dyn SessionStore>,
        config: AutosaveConfig,
    ) -> Self {
        Self {
            dispatcher,
            store,
            config,
        }
    }

    /// Run the save loop until shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.save_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing changed yet.
        interval.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.cycle().await;
                        tracing::info!("autosave stopped after final snapshot");
                        return;
                    }
                }
                _ = interval.tick() => self.cycle().await,
            }
        }
    }

    /// One evict-and-save pass. Also useful for testing without the loop.
    pub async fn save_once(&self) -> Result<usize, SessionStoreError> {
        let evicted = self
            .dispatcher
            .evict_ended(self.config.ended_retention)
            .await;
        if evicted > 0 {
            tracing::debug!(evicted, "ended games evicted before save");
        }
        self.dispatcher
            .registry()
            .save(self.store.as_ref())
            .await
    }

    async fn cycle(&self) {
        match self.save_once().await {
            Ok(saved) => tracing::debug!(games = saved, "games saved"),
            Err(e) => tracing::warn!(error = %e, "saving games failed, retrying next cycle"),
        }
    }
}

//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CODEX_SESSION` prefix and nested values use double underscores as separators.
//!
//! Every value has a default, so an empty environment yields a runnable server.
//!
//! # Example
//!
//! ```no_run
//! use codex_session::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("TCP binding on port {}", config.network.tcp_port);
//! ```

mod error;
mod liveness;
mod matchmaking;
mod network;
mod persistence;
mod server;

pub use error::{ConfigError, ValidationError};
pub use liveness::LivenessConfig;
pub use matchmaking::MatchmakingConfig;
pub use network::NetworkConfig;
pub use persistence::PersistenceConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Bind host, environment and logging
    #[serde(default)]
    pub server: ServerConfig,

    /// Ports and framing of the transport bindings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Heartbeat interval and disconnect threshold
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Snapshot file and save cadence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Lobby size and seating policy
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CODEX_SESSION` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CODEX_SESSION__NETWORK__TCP_PORT=9000` -> `network.tcp_port = 9000`
    /// - `CODEX_SESSION__LIVENESS__PULSE_THRESHOLD_MS=10000` -> `liveness.pulse_threshold_ms = 10000`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CODEX_SESSION")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.network.validate()?;
        self.liveness.validate()?;
        self.persistence.validate()?;
        self.matchmaking.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

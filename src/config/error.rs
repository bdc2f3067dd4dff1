//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number for {0}")]
    InvalidPort(&'static str),

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Pulse threshold must exceed the heartbeat interval")]
    ThresholdBelowHeartbeat,

    #[error("Interval must be positive: {0}")]
    ZeroInterval(&'static str),

    #[error("Seats per lobby must be between 2 and 4, got {0}")]
    InvalidSeatCount(usize),

    #[error("Max frame size must be positive")]
    InvalidFrameSize,
}

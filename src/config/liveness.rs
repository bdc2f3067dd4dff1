//! Heartbeat and disconnect-detection timing

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct LivenessConfig {
    /// Time between two heartbeat rounds
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Silence after which a peer counts as gone
    #[serde(default = "default_pulse_threshold_ms")]
    pub pulse_threshold_ms: u64,
}

impl LivenessConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn pulse_threshold(&self) -> Duration {
        Duration::from_millis(self.pulse_threshold_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.heartbeat_interval_ms == 0 {
            return Err(ValidationError::ZeroInterval("liveness.heartbeat_interval_ms"));
        }
        if self.pulse_threshold_ms <= self.heartbeat_interval_ms {
            return Err(ValidationError::ThresholdBelowHeartbeat);
        }
        Ok(())
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            pulse_threshold_ms: default_pulse_threshold_ms(),
        }
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    1000
}

fn default_pulse_threshold_ms() -> u64 {
    10_000
}

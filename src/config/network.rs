//! Network configuration for the two transport bindings

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Port of the framed TCP binding
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Port of the remote-invocation registry
    #[serde(default = "default_remote_port")]
    pub remote_port: u16,

    /// Name the dispatcher is published under in the registry
    #[serde(default = "default_remote_endpoint_name")]
    pub remote_endpoint_name: String,

    /// Largest accepted TCP frame
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Deadline for one remote call
    #[serde(default = "default_remote_call_timeout_ms")]
    pub remote_call_timeout_ms: u64,
}

impl NetworkConfig {
    pub fn remote_call_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_call_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tcp_port == 0 {
            return Err(ValidationError::InvalidPort("network.tcp_port"));
        }
        if self.remote_port == 0 {
            return Err(ValidationError::InvalidPort("network.remote_port"));
        }
        if self.remote_endpoint_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("network.remote_endpoint_name"));
        }
        if self.max_frame_bytes == 0 {
            return Err(ValidationError::InvalidFrameSize);
        }
        if self.remote_call_timeout_ms == 0 {
            return Err(ValidationError::ZeroInterval("network.remote_call_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_port: default_tcp_port(),
            remote_port: default_remote_port(),
            remote_endpoint_name: default_remote_endpoint_name(),
            max_frame_bytes: default_max_frame_bytes(),
            remote_call_timeout_ms: default_remote_call_timeout_ms(),
        }
    }
}

fn default_tcp_port() -> u16 {
    9000
}

fn default_remote_port() -> u16 {
    10999
}

fn default_remote_endpoint_name() -> String {
    "dispatcher".to_string()
}

fn default_max_frame_bytes() -> usize {
    1024 * 1024
}

fn default_remote_call_timeout_ms() -> u64 {
    2000
}

//! Client configuration

use std::time::Duration;

use crate::codec::DEFAULT_MAX_FRAME_LEN;
use crate::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_CRASH_TIMEOUT, DEFAULT_PORT};

/// Protocol client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Simulator host
    pub host: String,
    /// Simulator port
    pub port: u16,
    /// Deadline for establishing the connection
    pub connect_timeout: Duration,
    /// Deadline applied to commands that do not specify one
    pub command_timeout: Duration,
    /// Deadline applied to `execute_crash`
    pub crash_timeout: Duration,
    /// Maximum frame size in bytes
    pub max_frame_len: usize,
}

impl ClientConfig {
    /// `host:port` to dial
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(30),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            crash_timeout: DEFAULT_CRASH_TIMEOUT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulator address
    pub fn address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.host = host.into();
        self.config.port = port;
        self
    }

    /// Set the connect deadline
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the default per-command deadline
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Set the `execute_crash` deadline
    pub fn crash_timeout(mut self, timeout: Duration) -> Self {
        self.config.crash_timeout = timeout;
        self
    }

    /// Set the maximum frame size
    pub fn max_frame_len(mut self, max: usize) -> Self {
        self.config.max_frame_len = max;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

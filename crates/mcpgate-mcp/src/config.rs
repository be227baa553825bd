//! Configuration types for MCP sessions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// MCP protocol version sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Pause after `notifications/initialized` before the session is used.
///
/// Some remote gateways leave their "initializing" state asynchronously after
/// the notification arrives; requests sent too early are rejected.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

fn default_timeout() -> u64 {
    30000
}

fn default_settle_delay() -> u64 {
    DEFAULT_SETTLE_DELAY.as_millis() as u64
}

/// Tunables for talking to MCP endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    /// Protocol version requested during `initialize`.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    /// Timeout for each HTTP request in milliseconds (default: 30000).
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
    /// Delay after the initialized notification in milliseconds (default: 100).
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            request_timeout_ms: default_timeout(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

impl McpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = McpConfig::default();
        assert_eq!(config.protocol_version, "2024-11-05");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.settle_delay(), Duration::from_millis(100));
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
settle_delay_ms = 250
"#;
        let config: McpConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.settle_delay_ms, 250);
        assert_eq!(config.request_timeout_ms, 30000); // default
        assert_eq!(config.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
protocol_version = "2025-03-26"
request_timeout_ms = 5000
settle_delay_ms = 0
"#;
        let config: McpConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.protocol_version, "2025-03-26");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.settle_delay(), Duration::ZERO);
    }
}

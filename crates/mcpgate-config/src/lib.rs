//! Multi-tier TOML configuration for mcpgate.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use mcpgate_mcp::McpConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// The default listen address for the HTTP gateway.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3001";

/// The default timeout for provisioning calls.
pub const DEFAULT_PROVISION_TIMEOUT_MS: u64 = 60_000;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// How sandboxes (and their MCP endpoints) are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionerKind {
    /// A remote provisioning service creates one sandbox per session.
    Http,
    /// Every session points at one fixed MCP endpoint.
    Static,
}

impl std::str::FromStr for ProvisionerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(ProvisionerKind::Http),
            "static" => Ok(ProvisionerKind::Static),
            other => Err(ConfigError::InvalidValue {
                key: "provisioner.kind".into(),
                message: format!("expected 'http' or 'static', got '{other}'"),
            }),
        }
    }
}

/// Resolved provisioner settings.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionerConfig {
    Http { base_url: String, timeout_ms: u64 },
    Static { mcp_url: String, mcp_token: String },
}

/// Resolved configuration for a gateway process.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub provisioner: ProvisionerConfig,
    pub mcp: McpConfig,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub provisioner: ProvisionerSettings,
    #[serde(default)]
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind: Option<String>,
}

/// Provisioner section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionerSettings {
    pub kind: Option<ProvisionerKind>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub mcp_url: Option<String>,
    pub mcp_token: Option<String>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub provisioner_kind: Option<ProvisionerKind>,
    pub provisioner_url: Option<String>,
    pub mcp_url: Option<String>,
    pub settle_delay_ms: Option<u64>,
}

impl GatewayConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Config file (~/.mcpgate/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = load_settings_file(&config_dir.join("config.toml"));
        Self::resolve(overrides, |key| std::env::var(key).ok(), settings, config_dir)
    }

    /// Apply precedence rules to already-gathered sources.
    pub fn resolve(
        overrides: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
        settings: SettingsFile,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        // Resolve bind address: CLI > env > config file > default
        let bind = overrides
            .bind
            .or_else(|| env("MCPGATE_BIND"))
            .or(settings.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind.parse().map_err(|e| ConfigError::InvalidValue {
            key: "server.bind".into(),
            message: format!("{bind}: {e}"),
        })?;

        let base_url = overrides
            .provisioner_url
            .or_else(|| env("MCPGATE_PROVISIONER_URL"))
            .or(settings.provisioner.base_url);
        let mcp_url = overrides
            .mcp_url
            .or_else(|| env("MCPGATE_MCP_URL"))
            .or(settings.provisioner.mcp_url);
        let mcp_token = env("MCPGATE_MCP_TOKEN")
            .or(settings.provisioner.mcp_token)
            .unwrap_or_default();

        // Resolve provisioner kind; a bare MCP URL implies static mode
        let kind = match overrides.provisioner_kind {
            Some(kind) => kind,
            None => match env("MCPGATE_PROVISIONER") {
                Some(raw) => raw.parse()?,
                None => settings.provisioner.kind.unwrap_or(if mcp_url.is_some() {
                    ProvisionerKind::Static
                } else {
                    ProvisionerKind::Http
                }),
            },
        };

        let provisioner = match kind {
            ProvisionerKind::Http => ProvisionerConfig::Http {
                base_url: base_url.ok_or_else(|| ConfigError::MissingKey {
                    key: "provisioner.base_url (set MCPGATE_PROVISIONER_URL or add to ~/.mcpgate/config.toml)".into(),
                })?,
                timeout_ms: settings
                    .provisioner
                    .timeout_ms
                    .unwrap_or(DEFAULT_PROVISION_TIMEOUT_MS),
            },
            ProvisionerKind::Static => ProvisionerConfig::Static {
                mcp_url: mcp_url.ok_or_else(|| ConfigError::MissingKey {
                    key: "provisioner.mcp_url (set MCPGATE_MCP_URL or add to ~/.mcpgate/config.toml)".into(),
                })?,
                mcp_token,
            },
        };

        let mut mcp = settings.mcp;
        if let Some(delay) = overrides.settle_delay_ms {
            mcp.settle_delay_ms = delay;
        }
        if mcp.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "mcp.request_timeout_ms".into(),
                message: "must be greater than zero".into(),
            });
        }

        Ok(GatewayConfig {
            bind_addr,
            provisioner,
            mcp,
            config_dir,
        })
    }
}

/// Get the mcpgate config directory path (~/.mcpgate/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MCPGATE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcpgate")
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &std::path::Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}

//! Sandbox provisioning.
//!
//! A provisioner creates a remote sandbox that exposes an MCP endpoint and
//! hands back its URL and bearer token. The gateway never talks to sandboxes
//! except through the MCP session built on that pair.

use crate::error::ProvisionError;
use mcpgate_config::ProvisionerConfig;
use mcpgate_mcp::session::redact;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future returned by [`SandboxProvisioner`] methods.
pub type ProvisionFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProvisionError>> + Send + 'a>>;

/// What the gateway keeps about a live sandbox.
#[derive(Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    pub sandbox_id: String,
    pub mcp_url: String,
    /// Credential used to manage the sandbox after creation.
    pub api_key: String,
}

impl fmt::Debug for SandboxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SandboxHandle")
            .field("sandbox_id", &self.sandbox_id)
            .field("mcp_url", &self.mcp_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// A freshly created sandbox.
#[derive(Debug, Clone)]
pub struct ProvisionedSandbox {
    pub handle: SandboxHandle,
    pub mcp_token: String,
}

/// Creates and manages sandboxes that expose MCP endpoints.
pub trait SandboxProvisioner: Send + Sync {
    /// Create a sandbox running the given MCP servers.
    fn provision<'a>(
        &'a self,
        api_key: &'a str,
        mcp_servers: &'a serde_json::Value,
    ) -> ProvisionFuture<'a, ProvisionedSandbox>;

    /// Whether the sandbox is still alive.
    fn is_running<'a>(&'a self, sandbox: &'a SandboxHandle) -> ProvisionFuture<'a, bool>;

    /// Destroy the sandbox. Destroying an already-gone sandbox succeeds.
    fn teardown<'a>(&'a self, sandbox: &'a SandboxHandle) -> ProvisionFuture<'a, ()>;
}

/// Build the provisioner described by the configuration.
pub fn from_config(config: &ProvisionerConfig) -> Result<Arc<dyn SandboxProvisioner>, ProvisionError> {
    Ok(match config {
        ProvisionerConfig::Http {
            base_url,
            timeout_ms,
        } => Arc::new(HttpProvisioner::new(
            base_url,
            Duration::from_millis(*timeout_ms),
        )?),
        ProvisionerConfig::Static { mcp_url, mcp_token } => {
            Arc::new(StaticProvisioner::new(mcp_url, mcp_token))
        }
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSandboxRequest<'a> {
    mcp_servers: &'a serde_json::Value,
    timeout_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSandboxResponse {
    sandbox_id: String,
    mcp_url: String,
    #[serde(default)]
    mcp_token: String,
}

/// Provisioner backed by a remote sandbox service.
///
/// `POST {base}/sandboxes` creates, `GET {base}/sandboxes/{id}` probes and
/// `DELETE {base}/sandboxes/{id}` destroys; every call carries `X-API-Key`.
/// The creation body carries the same timeout the client waits for.
#[derive(Debug, Clone)]
pub struct HttpProvisioner {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpProvisioner {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProvisionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn sandbox_url(&self, sandbox_id: &str) -> String {
        format!("{}/sandboxes/{}", self.base_url, sandbox_id)
    }
}

impl SandboxProvisioner for HttpProvisioner {
    fn provision<'a>(
        &'a self,
        api_key: &'a str,
        mcp_servers: &'a serde_json::Value,
    ) -> ProvisionFuture<'a, ProvisionedSandbox> {
        Box::pin(async move {
            let url = format!("{}/sandboxes", self.base_url);
            tracing::debug!(api_key = %redact(api_key), "POST {url}");

            let resp = self
                .http
                .post(&url)
                .header("X-API-Key", api_key)
                .json(&CreateSandboxRequest {
                    mcp_servers,
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
                .send()
                .await?;

            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                return Err(ProvisionError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            let created: CreateSandboxResponse = serde_json::from_str(&body)
                .map_err(|e| ProvisionError::InvalidResponse(e.to_string()))?;
            tracing::info!(sandbox_id = %created.sandbox_id, "Sandbox created");

            Ok(ProvisionedSandbox {
                handle: SandboxHandle {
                    sandbox_id: created.sandbox_id,
                    mcp_url: created.mcp_url,
                    api_key: api_key.to_string(),
                },
                mcp_token: created.mcp_token,
            })
        })
    }

    fn is_running<'a>(&'a self, sandbox: &'a SandboxHandle) -> ProvisionFuture<'a, bool> {
        Box::pin(async move {
            let resp = self
                .http
                .get(self.sandbox_url(&sandbox.sandbox_id))
                .header("X-API-Key", &sandbox.api_key)
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                return Ok(true);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(false);
            }
            Err(ProvisionError::Rejected {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            })
        })
    }

    fn teardown<'a>(&'a self, sandbox: &'a SandboxHandle) -> ProvisionFuture<'a, ()> {
        Box::pin(async move {
            let resp = self
                .http
                .delete(self.sandbox_url(&sandbox.sandbox_id))
                .header("X-API-Key", &sandbox.api_key)
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
                tracing::info!(sandbox_id = %sandbox.sandbox_id, "Sandbox torn down");
                return Ok(());
            }
            Err(ProvisionError::Rejected {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            })
        })
    }
}

/// Provisioner that points every session at one already-running MCP server.
#[derive(Debug, Clone)]
pub struct StaticProvisioner {
    mcp_url: String,
    mcp_token: String,
}

impl StaticProvisioner {
    pub fn new(mcp_url: impl Into<String>, mcp_token: impl Into<String>) -> Self {
        Self {
            mcp_url: mcp_url.into(),
            mcp_token: mcp_token.into(),
        }
    }
}

impl SandboxProvisioner for StaticProvisioner {
    fn provision<'a>(
        &'a self,
        api_key: &'a str,
        _mcp_servers: &'a serde_json::Value,
    ) -> ProvisionFuture<'a, ProvisionedSandbox> {
        Box::pin(async move {
            Ok(ProvisionedSandbox {
                handle: SandboxHandle {
                    sandbox_id: uuid::Uuid::new_v4().to_string(),
                    mcp_url: self.mcp_url.clone(),
                    api_key: api_key.to_string(),
                },
                mcp_token: self.mcp_token.clone(),
            })
        })
    }

    fn is_running<'a>(&'a self, _sandbox: &'a SandboxHandle) -> ProvisionFuture<'a, bool> {
        Box::pin(async { Ok(true) })
    }

    fn teardown<'a>(&'a self, _sandbox: &'a SandboxHandle) -> ProvisionFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}

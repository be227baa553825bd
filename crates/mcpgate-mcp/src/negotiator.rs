//! MCP session negotiation.
//!
//! Runs the two-step lifecycle handshake (`initialize` request followed by the
//! `notifications/initialized` notification) and captures the session id the
//! server hands out. No retries happen here; callers decide.

use crate::config::McpConfig;
use crate::envelope::decode_envelope;
use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, RequestIds};
use crate::session::{Session, redact};
use crate::transport::HttpTransport;
use std::time::Duration;

/// Client name announced in `initialize`.
pub const CLIENT_NAME: &str = "mcpgate";

/// Performs the MCP handshake against an endpoint.
#[derive(Debug)]
pub struct Negotiator {
    transport: HttpTransport,
    ids: RequestIds,
    protocol_version: String,
    settle_delay: Duration,
}

impl Negotiator {
    pub fn new(transport: HttpTransport, config: &McpConfig) -> Self {
        Self {
            transport,
            ids: RequestIds::new(),
            protocol_version: config.protocol_version.clone(),
            settle_delay: config.settle_delay(),
        }
    }

    /// Negotiate a fresh session with `endpoint`, registered under `key`.
    pub async fn negotiate(
        &self,
        key: &str,
        endpoint: &str,
        token: &str,
    ) -> Result<Session, McpError> {
        tracing::debug!(key, token = %redact(token), "Negotiating MCP session with {endpoint}");

        let init_params = serde_json::json!({
            "protocolVersion": self.protocol_version,
            "capabilities": {
                "tools": {}
            },
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let request = JsonRpcRequest::new(self.ids.next_id(), "initialize", Some(init_params));

        let reply = self
            .transport
            .post(endpoint, token, None, &request)
            .await?
            .into_success()
            .map_err(handshake_failure)?;

        let session_id = reply.session_id.clone().unwrap_or_default();
        if session_id.is_empty() {
            tracing::warn!(key, "MCP server sent no Mcp-Session-Id header; continuing without one");
        }

        let envelope = decode_envelope(&reply.content_type, &reply.body)?;
        if let Some(err) = envelope.error {
            return Err(McpError::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }

        let notification = JsonRpcNotification::new("notifications/initialized", None);
        self.transport
            .post(endpoint, token, Some(&session_id), &notification)
            .await?
            .into_success()
            .map_err(handshake_failure)?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        tracing::info!(key, session_id = %session_id, "MCP session established");

        Ok(Session {
            key: key.to_string(),
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            session_id,
            established: true,
        })
    }
}

/// A 404 during the handshake is not a lost session: there is nothing to
/// recover into, so report it as a plain transport failure.
fn handshake_failure(err: McpError) -> McpError {
    match err {
        McpError::SessionLost { body } => McpError::Transport { status: 404, body },
        other => other,
    }
}

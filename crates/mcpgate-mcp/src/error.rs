//! Error types for MCP operations.

use thiserror::Error;

/// Errors from MCP session negotiation and protocol calls.
#[derive(Debug, Error)]
pub enum McpError {
    /// The remote endpoint answered with a non-success HTTP status.
    #[error("MCP transport error (HTTP {status}): {body}")]
    Transport { status: u16, body: String },

    /// The request never produced an HTTP response (connect, timeout, read).
    #[error("MCP network error: {0}")]
    Network(String),

    /// The remote no longer knows the session or its sandbox.
    #[error("MCP session not found on remote: {body}")]
    SessionLost { body: String },

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("JSON-RPC error (code {code}): {message}")]
    JsonRpc { code: i64, message: String },

    #[error("No MCP session registered for '{key}'")]
    UnknownSession { key: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Whether re-negotiating the session may fix this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, McpError::SessionLost { .. })
    }

    /// Whether the failure came from the HTTP layer rather than the payload.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            McpError::Transport { .. } | McpError::Network(_) | McpError::SessionLost { .. }
        )
    }

    /// The message text of the remote failure, without the variant prefix.
    pub fn remote_message(&self) -> String {
        match self {
            McpError::Transport { body, .. } | McpError::SessionLost { body } => body.clone(),
            McpError::JsonRpc { message, .. } => message.clone(),
            McpError::Protocol(msg) | McpError::Network(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for McpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            McpError::Network(format!("request timed out: {e}"))
        } else {
            McpError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_lost_is_recoverable() {
        assert!(
            McpError::SessionLost {
                body: "sandbox not found".into()
            }
            .is_recoverable()
        );
        assert!(
            !McpError::Transport {
                status: 500,
                body: "boom".into()
            }
            .is_recoverable()
        );
        assert!(!McpError::Protocol("malformed SSE body".into()).is_recoverable());
    }

    #[test]
    fn remote_message_preserves_body() {
        let err = McpError::Transport {
            status: 502,
            body: "upstream exploded".into(),
        };
        assert_eq!(err.remote_message(), "upstream exploded");
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn jsonrpc_is_not_transport() {
        let err = McpError::JsonRpc {
            code: -32601,
            message: "Method not found".into(),
        };
        assert!(!err.is_transport());
        assert_eq!(err.remote_message(), "Method not found");
    }
}

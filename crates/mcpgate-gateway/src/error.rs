//! Error types for the HTTP gateway.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mcpgate_mcp::McpError;
use thiserror::Error;

/// Errors from the sandbox provisioning collaborator.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Provisioner network error: {0}")]
    Network(String),

    #[error("Provisioner rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid provisioner response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProvisionError {
    fn from(e: reqwest::Error) -> Self {
        ProvisionError::Network(e.to_string())
    }
}

/// Errors returned by gateway handlers, rendered as JSON bodies.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("Sandbox not found")]
    SandboxNotFound,

    #[error("Failed to create sandbox: {0}")]
    Provision(#[from] ProvisionError),

    #[error("{context}: {source}")]
    Mcp {
        context: &'static str,
        source: McpError,
    },
}

impl GatewayError {
    /// Wrap an MCP error, turning an unknown session into a 404.
    pub fn mcp(context: &'static str, source: McpError) -> Self {
        match source {
            McpError::UnknownSession { .. } => GatewayError::SandboxNotFound,
            source => GatewayError::Mcp { context, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingField { .. } => StatusCode::BAD_REQUEST,
            GatewayError::SandboxNotFound => StatusCode::NOT_FOUND,
            GatewayError::Provision(_) | GatewayError::Mcp { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::MissingField { .. } | GatewayError::SandboxNotFound => {
                serde_json::json!({ "error": self.to_string() })
            }
            GatewayError::Provision(e) => serde_json::json!({
                "error": "Failed to create sandbox",
                "details": e.to_string(),
            }),
            GatewayError::Mcp { context, source } => serde_json::json!({
                "error": context,
                "details": source.remote_message(),
            }),
        };
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        (status, Json(body)).into_response()
    }
}

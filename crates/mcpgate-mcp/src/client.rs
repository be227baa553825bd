//! MCP protocol client: `tools/list` and `tools/call` over an established
//! session.
//!
//! Listing failures are errors; tool-call failures reported by the server are
//! returned as [`CallOutcome::Failure`] so a conversation can carry on.

use crate::envelope::decode_envelope;
use crate::error::McpError;
use crate::jsonrpc::{JsonRpcEnvelope, JsonRpcRequest, RequestIds};
use crate::session::Session;
use crate::transport::HttpTransport;
use serde::{Deserialize, Serialize};

/// Information about a tool exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Result of calling a tool on an MCP server.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The server's `result`, passed through untouched.
    Success { payload: serde_json::Value },
    Failure {
        message: String,
        /// True when the session or sandbox is gone and re-negotiating may help.
        is_recoverable: bool,
    },
}

impl CallOutcome {
    /// Build a failure outcome from an error that survived recovery.
    pub fn from_error(err: &McpError) -> Self {
        CallOutcome::Failure {
            message: err.remote_message(),
            is_recoverable: err.is_recoverable(),
        }
    }

    /// True for failures and for results flagged `"isError": true`.
    pub fn is_error(&self) -> bool {
        match self {
            CallOutcome::Success { payload } => payload
                .get("isError")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            CallOutcome::Failure { .. } => true,
        }
    }

    /// The outcome as an MCP-shaped result value.
    ///
    /// Failures become a single text content block so a model sees the
    /// message the same way it sees tool output.
    pub fn into_result_value(self) -> serde_json::Value {
        match self {
            CallOutcome::Success { payload } => payload,
            CallOutcome::Failure { message, .. } => serde_json::json!({
                "content": [{"type": "text", "text": message}],
                "isError": true
            }),
        }
    }
}

#[derive(Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

/// Issues tool requests against a negotiated session.
#[derive(Debug)]
pub struct ProtocolClient {
    transport: HttpTransport,
    ids: RequestIds,
}

impl ProtocolClient {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            ids: RequestIds::new(),
        }
    }

    /// List the tools the session exposes.
    pub async fn list_tools(&self, session: &Session) -> Result<Vec<ToolDescriptor>, McpError> {
        let envelope = self
            .request(session, "tools/list", serde_json::json!({}))
            .await?;

        if let Some(err) = envelope.error {
            return Err(McpError::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }

        let tools = match envelope.result {
            Some(result) if !result.is_null() => {
                let list: ToolsListResult = serde_json::from_value(result).map_err(|e| {
                    McpError::Protocol(format!("Failed to parse tools/list response: {e}"))
                })?;
                list.tools
            }
            _ => Vec::new(),
        };

        tracing::debug!(key = %session.key, count = tools.len(), "Listed MCP tools");
        Ok(tools)
    }

    /// Call a tool by name.
    ///
    /// Transport failures (including session loss) are errors so the caller
    /// can recover; JSON-RPC errors are returned as [`CallOutcome::Failure`].
    pub async fn call_tool(
        &self,
        session: &Session,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallOutcome, McpError> {
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });

        let envelope = self.request(session, "tools/call", params).await?;

        if let Some(err) = envelope.error {
            tracing::debug!(tool = tool_name, code = err.code, "Tool call returned JSON-RPC error");
            return Ok(CallOutcome::Failure {
                message: err.message,
                is_recoverable: false,
            });
        }

        Ok(CallOutcome::Success {
            payload: envelope.result.unwrap_or(serde_json::Value::Null),
        })
    }

    async fn request(
        &self,
        session: &Session,
        method: &str,
        params: serde_json::Value,
    ) -> Result<JsonRpcEnvelope, McpError> {
        let request = JsonRpcRequest::new(self.ids.next_id(), method, Some(params));
        tracing::debug!(key = %session.key, id = request.id, "MCP {method}");

        let reply = self
            .transport
            .post(
                &session.endpoint,
                &session.token,
                Some(&session.session_id),
                &request,
            )
            .await?
            .into_success()?;

        decode_envelope(&reply.content_type, &reply.body)
    }
}

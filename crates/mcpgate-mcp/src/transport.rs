//! Streamable HTTP transport for MCP server communication.
//!
//! Every JSON-RPC message is a single `POST` to the MCP endpoint. The reply
//! is read in full; decoding is left to [`crate::envelope`].

use crate::error::McpError;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use serde::Serialize;
use std::time::Duration;

/// Header carrying the MCP session identifier in both directions.
pub const SESSION_ID_HEADER: &str = "Mcp-Session-Id";

/// Media types accepted from MCP servers.
pub const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// A fully-read HTTP reply from an MCP endpoint.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: String,
    pub session_id: Option<String>,
    pub body: String,
}

impl HttpReply {
    /// Turn a non-success status into an error, classifying session loss.
    pub fn into_success(self) -> Result<Self, McpError> {
        if (200..300).contains(&self.status) {
            return Ok(self);
        }
        if is_session_lost(self.status, &self.body) {
            return Err(McpError::SessionLost { body: self.body });
        }
        Err(McpError::Transport {
            status: self.status,
            body: self.body,
        })
    }
}

/// Whether a reply means the remote no longer knows the session or sandbox.
///
/// Only 404 qualifies. An empty body counts, since Streamable HTTP servers
/// answer an unknown `Mcp-Session-Id` with a bare 404.
pub fn is_session_lost(status: u16, body: &str) -> bool {
    if status != 404 {
        return false;
    }
    let body = body.trim().to_ascii_lowercase();
    if body.is_empty() {
        return true;
    }
    body.contains("not found") && (body.contains("sandbox") || body.contains("session"))
}

/// HTTP transport shared by the negotiator and the protocol client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| McpError::Network(e.to_string()))?;
        Ok(Self { http })
    }

    /// Wrap an existing client (useful to share connection pools).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST one JSON-RPC message and read the whole reply.
    ///
    /// Non-success statuses are returned as-is; callers decide how to
    /// classify them via [`HttpReply::into_success`].
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        token: &str,
        session_id: Option<&str>,
        message: &T,
    ) -> Result<HttpReply, McpError> {
        let body = serde_json::to_vec(message)?;

        let mut req = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_BOTH)
            .body(body);

        if !token.is_empty() {
            req = req.bearer_auth(token);
        }
        if let Some(sid) = session_id.filter(|s| !s.is_empty()) {
            req = req.header(SESSION_ID_HEADER, sid);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let content_type = header_string(resp.headers(), CONTENT_TYPE.as_str()).unwrap_or_default();
        let session_id = header_string(resp.headers(), SESSION_ID_HEADER);
        let body = resp.text().await?;

        tracing::debug!(status, content_type = %content_type, "MCP HTTP reply from {endpoint}");

        Ok(HttpReply {
            status,
            content_type,
            session_id,
            body,
        })
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> HttpReply {
        HttpReply {
            status,
            content_type: "application/json".into(),
            session_id: None,
            body: body.into(),
        }
    }

    #[test]
    fn session_lost_detection() {
        assert!(is_session_lost(404, "Sandbox not found"));
        assert!(is_session_lost(404, r#"{"error":"session not found"}"#));
        assert!(is_session_lost(404, ""));
        assert!(!is_session_lost(404, "route not found"));
        assert!(!is_session_lost(500, "sandbox not found"));
    }

    #[test]
    fn success_passes_through() {
        let r = reply(200, "{}").into_success().unwrap();
        assert_eq!(r.body, "{}");
        assert!(reply(202, "").into_success().is_ok());
    }

    #[test]
    fn not_found_session_is_recoverable() {
        let err = reply(404, "sandbox not found").into_success().unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn other_failures_keep_body_verbatim() {
        let err = reply(401, "bad token").into_success().unwrap_err();
        match err {
            McpError::Transport { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad token");
            }
            other => panic!("Expected Transport, got: {other:?}"),
        }
    }

    #[test]
    fn builds_transport() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }
}

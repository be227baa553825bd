//! Decoding of MCP HTTP response bodies.
//!
//! Streamable HTTP servers answer either with a plain JSON body or with an
//! SSE stream carrying the JSON-RPC message in a `data:` line. Some servers
//! send SSE framing under an `application/json` content type, so the body is
//! sniffed as well as the header.

use crate::error::McpError;
use crate::jsonrpc::JsonRpcEnvelope;

/// Decode a response body into a JSON-RPC envelope.
///
/// The body is treated as SSE when `content_type` mentions
/// `text/event-stream` or when its first line starts with `event:`.
/// Otherwise the whole body must be a JSON object.
pub fn decode_envelope(content_type: &str, body: &str) -> Result<JsonRpcEnvelope, McpError> {
    if is_event_stream(content_type, body) {
        let data = first_json_data_line(body)
            .ok_or_else(|| McpError::Protocol("malformed SSE body".to_string()))?;
        return serde_json::from_str(data)
            .map_err(|e| McpError::Protocol(format!("Failed to parse SSE data as JSON-RPC: {e}")));
    }

    serde_json::from_str(body)
        .map_err(|e| McpError::Protocol(format!("Failed to parse JSON-RPC body: {e}")))
}

fn is_event_stream(content_type: &str, body: &str) -> bool {
    if content_type.to_ascii_lowercase().contains("text/event-stream") {
        return true;
    }
    body.trim_start()
        .lines()
        .next()
        .is_some_and(|line| line.starts_with("event:"))
}

/// Find the first `data:` line whose payload is a `{...}` object and return
/// the object text.
fn first_json_data_line(body: &str) -> Option<&str> {
    body.lines().find_map(|line| {
        let line = line.trim_end_matches('\r');
        let start = line.find("data:")?;
        let payload = line[start + "data:".len()..].trim_start();
        if !payload.starts_with('{') {
            return None;
        }
        let end = payload.rfind('}')?;
        Some(&payload[..=end])
    })
}

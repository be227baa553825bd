//! `/api/mcp/*` routes.
//!
//! Tool-call failures are always answered with 200 and `isError: true`; only
//! bad requests, unknown sandboxes and setup/listing failures map to HTTP
//! error statuses.

use crate::error::GatewayError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use mcpgate_mcp::{CallOutcome, ToolDescriptor};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// MCP servers started in a sandbox when the client names none.
pub fn default_mcp_servers() -> serde_json::Value {
    serde_json::json!({
        "duckduckgo": {},
        "arxiv": { "storagePath": "/" }
    })
}

/// Build the gateway router.
///
/// The permissive CORS layer answers every `OPTIONS` request itself with the
/// CORS headers and an empty body.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/mcp/init", post(init))
        .route(
            "/api/mcp/sandbox/{id}",
            get(sandbox_status).delete(teardown_sandbox),
        )
        .route("/api/mcp/tools/{id}", get(list_tools))
        .route("/api/mcp/call/{id}", post(call_tool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub mcp_servers: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub sandbox_id: String,
    pub mcp_url: String,
    pub mcp_token: String,
}

async fn init(
    State(state): State<AppState>,
    Json(req): Json<InitRequest>,
) -> Result<Json<InitResponse>, GatewayError> {
    let api_key = req
        .api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(GatewayError::MissingField { field: "apiKey" })?;
    let servers = req
        .mcp_servers
        .filter(|s| !s.is_null())
        .unwrap_or_else(default_mcp_servers);

    let sandbox = state.provisioner.provision(&api_key, &servers).await?;
    let handle = sandbox.handle;

    if let Err(e) = state
        .sessions
        .open(&handle.sandbox_id, &handle.mcp_url, &sandbox.mcp_token)
        .await
    {
        if let Err(te) = state.provisioner.teardown(&handle).await {
            tracing::warn!(sandbox_id = %handle.sandbox_id, "Failed to tear down sandbox after handshake error: {te}");
        }
        return Err(GatewayError::mcp("Failed to initialize MCP session", e));
    }

    let response = InitResponse {
        sandbox_id: handle.sandbox_id.clone(),
        mcp_url: handle.mcp_url.clone(),
        mcp_token: sandbox.mcp_token,
    };
    state.remember_sandbox(handle).await;
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxStatus {
    pub sandbox_id: String,
    pub is_running: bool,
    pub url: String,
}

async fn sandbox_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SandboxStatus>, GatewayError> {
    let session = state
        .sessions
        .session(&id)
        .await
        .map_err(|e| GatewayError::mcp("Failed to read session", e))?
        .ok_or(GatewayError::SandboxNotFound)?;

    let is_running = match state.sandbox(&id).await {
        Some(handle) => state
            .provisioner
            .is_running(&handle)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(sandbox_id = %id, "Sandbox status probe failed: {e}");
                false
            }),
        None => false,
    };

    Ok(Json(SandboxStatus {
        sandbox_id: id,
        is_running,
        url: session.endpoint,
    }))
}

async fn teardown_sandbox(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    state
        .sessions
        .close(&id)
        .await
        .map_err(|e| GatewayError::mcp("Failed to close session", e))?
        .ok_or(GatewayError::SandboxNotFound)?;

    if let Some(handle) = state.forget_sandbox(&id).await {
        if let Err(e) = state.provisioner.teardown(&handle).await {
            tracing::warn!(sandbox_id = %id, "Sandbox teardown failed: {e}");
        }
    }

    Ok(Json(serde_json::json!({ "sandboxId": id, "terminated": true })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDescriptor>,
    pub count: usize,
}

async fn list_tools(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ToolsResponse>, GatewayError> {
    let tools = state
        .sessions
        .list_tools(&id)
        .await
        .map_err(|e| GatewayError::mcp("Failed to list tools", e))?;
    let count = tools.len();
    Ok(Json(ToolsResponse { tools, count }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub args: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub result: serde_json::Value,
    pub is_error: bool,
}

async fn call_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CallRequest>,
) -> Result<Json<CallResponse>, GatewayError> {
    let tool_name = req
        .tool_name
        .filter(|n| !n.trim().is_empty())
        .ok_or(GatewayError::MissingField { field: "toolName" })?;
    let args = req
        .args
        .filter(|a| !a.is_null())
        .unwrap_or_else(|| serde_json::json!({}));

    let outcome = match state.sessions.call_tool(&id, &tool_name, args).await {
        Ok(outcome) => outcome,
        Err(e) => match GatewayError::mcp("Tool call failed", e) {
            GatewayError::Mcp { source, .. } => {
                tracing::warn!(sandbox_id = %id, tool = %tool_name, "Tool call failed: {source}");
                CallOutcome::from_error(&source)
            }
            other => return Err(other),
        },
    };

    let is_error = outcome.is_error();
    Ok(Json(CallResponse {
        result: outcome.into_result_value(),
        is_error,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::StaticProvisioner;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::{Method, StatusCode};
    use axum::response::Response;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN};
    use mcpgate_mcp::{InMemorySessionStore, McpConfig, SessionManager};
    use std::sync::Arc;
    use tower::ServiceExt as _;

    fn app() -> Router {
        let store = Arc::new(InMemorySessionStore::new());
        let sessions = Arc::new(SessionManager::new(&McpConfig::default(), store).unwrap());
        let provisioner = Arc::new(StaticProvisioner::new("http://127.0.0.1:1/mcp", ""));
        router(AppState::new(sessions, provisioner))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn init_requires_api_key() {
        let resp = app()
            .oneshot(post_json("/api/mcp/init", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "apiKey is required");
    }

    #[tokio::test]
    async fn call_requires_tool_name() {
        let resp = app()
            .oneshot(post_json("/api/mcp/call/abc", serde_json::json!({"args": {}})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "toolName is required");
    }

    #[tokio::test]
    async fn unknown_sandbox_is_not_found() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/mcp/tools/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"error": "Sandbox not found"})
        );

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/mcp/call/nope",
                serde_json::json!({"toolName": "search", "args": {"q": "ai"}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"error": "Sandbox not found"})
        );

        for method in [Method::GET, Method::DELETE] {
            let resp = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/api/mcp/sandbox/nope")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn options_short_circuits_with_cors() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/mcp/init")
                    .header(ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn responses_carry_cors_headers() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[test]
    fn default_servers() {
        let servers = default_mcp_servers();
        assert_eq!(servers["duckduckgo"], serde_json::json!({}));
        assert_eq!(servers["arxiv"]["storagePath"], "/");
    }
}

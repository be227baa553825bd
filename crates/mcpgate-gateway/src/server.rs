//! Serving the gateway over TCP.

use crate::error::ProvisionError;
use crate::provisioner;
use crate::routes::router;
use crate::state::AppState;
use mcpgate_config::GatewayConfig;
use mcpgate_mcp::{InMemorySessionStore, McpError, SessionManager};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Errors while starting or running the server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to build MCP session manager: {0}")]
    Mcp(#[from] McpError),

    #[error("Failed to build provisioner: {0}")]
    Provisioner(#[from] ProvisionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build handler state from configuration, with an in-memory session store.
pub fn state_from_config(config: &GatewayConfig) -> Result<AppState, ServeError> {
    let store = Arc::new(InMemorySessionStore::new());
    let sessions = Arc::new(SessionManager::new(&config.mcp, store)?);
    let provisioner = provisioner::from_config(&config.provisioner)?;
    Ok(AppState::new(sessions, provisioner))
}

/// Serve on `listener` until `shutdown` is cancelled.
///
/// In-flight requests finish before this returns. A client that disconnects
/// drops its handler future, which drops the outbound MCP request with it.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "mcpgate listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("mcpgate stopped");
    Ok(())
}

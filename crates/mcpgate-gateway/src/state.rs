//! Shared state for gateway handlers.

use crate::provisioner::{SandboxHandle, SandboxProvisioner};
use mcpgate_mcp::SessionManager;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub provisioner: Arc<dyn SandboxProvisioner>,
    sandboxes: Arc<RwLock<HashMap<String, SandboxHandle>>>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, provisioner: Arc<dyn SandboxProvisioner>) -> Self {
        Self {
            sessions,
            provisioner,
            sandboxes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn remember_sandbox(&self, handle: SandboxHandle) {
        self.sandboxes
            .write()
            .await
            .insert(handle.sandbox_id.clone(), handle);
    }

    pub async fn sandbox(&self, sandbox_id: &str) -> Option<SandboxHandle> {
        self.sandboxes.read().await.get(sandbox_id).cloned()
    }

    pub async fn forget_sandbox(&self, sandbox_id: &str) -> Option<SandboxHandle> {
        self.sandboxes.write().await.remove(sandbox_id)
    }
}

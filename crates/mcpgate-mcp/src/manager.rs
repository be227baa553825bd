//! MCP session manager: ties negotiation, the protocol client and the
//! session registry together.
//!
//! Every tool operation goes through [`SessionManager::with_session_recovery`]:
//! when the remote reports the session gone, the entry is evicted, the
//! session is negotiated again once, and the operation is retried once.

use crate::client::{CallOutcome, ProtocolClient, ToolDescriptor};
use crate::config::McpConfig;
use crate::error::McpError;
use crate::negotiator::Negotiator;
use crate::registry::SessionStore;
use crate::session::Session;
use crate::transport::HttpTransport;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Manages negotiated sessions for many keys.
pub struct SessionManager {
    negotiator: Negotiator,
    client: ProtocolClient,
    store: Arc<dyn SessionStore>,
    recovery_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionManager {
    /// Build a manager with a fresh HTTP transport.
    pub fn new(config: &McpConfig, store: Arc<dyn SessionStore>) -> Result<Self, McpError> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::from_parts(
            Negotiator::new(transport.clone(), config),
            ProtocolClient::new(transport),
            store,
        ))
    }

    pub fn from_parts(
        negotiator: Negotiator,
        client: ProtocolClient,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            negotiator,
            client,
            store,
            recovery_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Negotiate a session with `endpoint` and register it under `key`,
    /// replacing any previous session for that key.
    pub async fn open(&self, key: &str, endpoint: &str, token: &str) -> Result<Session, McpError> {
        let session = self.negotiator.negotiate(key, endpoint, token).await?;
        self.store.put(session.clone()).await?;
        Ok(session)
    }

    /// The registered session for `key`, if any.
    pub async fn session(&self, key: &str) -> Result<Option<Session>, McpError> {
        self.store.get(key).await
    }

    /// Tear down the session for `key`.
    pub async fn close(&self, key: &str) -> Result<Option<Session>, McpError> {
        let removed = self.forget(key).await?;
        if removed.is_some() {
            tracing::info!(key, "MCP session closed");
        }
        Ok(removed)
    }

    /// Evict `key` and drop its recovery lock.
    async fn forget(&self, key: &str) -> Result<Option<Session>, McpError> {
        self.recovery_locks.lock().await.remove(key);
        self.store.evict(key).await
    }

    /// List tools for the session under `key`.
    pub async fn list_tools(&self, key: &str) -> Result<Vec<ToolDescriptor>, McpError> {
        let client = &self.client;
        self.with_session_recovery(key, |session| async move {
            client.list_tools(&session).await
        })
        .await
    }

    /// Call a tool on the session under `key`.
    ///
    /// An error here means the session was unknown, or the call failed at the
    /// transport level even after recovery.
    pub async fn call_tool(
        &self,
        key: &str,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallOutcome, McpError> {
        let client = &self.client;
        let arguments = &arguments;
        self.with_session_recovery(key, |session| {
            let arguments = arguments.clone();
            async move { client.call_tool(&session, tool_name, arguments).await }
        })
        .await
    }

    /// Run `op` against the session for `key`, recovering once from session
    /// loss.
    ///
    /// On a recoverable error the entry is evicted and negotiated again with
    /// the same endpoint and token, then `op` runs exactly once more. Whatever
    /// the retry returns is final.
    pub async fn with_session_recovery<T, F, Fut>(&self, key: &str, op: F) -> Result<T, McpError>
    where
        F: Fn(Session) -> Fut,
        Fut: Future<Output = Result<T, McpError>>,
    {
        let session = self.registered(key).await?;

        match op(session.clone()).await {
            Err(err) if err.is_recoverable() => {
                tracing::warn!(key, "MCP session lost ({err}); re-negotiating");
                let fresh = self.renegotiate(&session).await?;
                let retried = op(fresh).await;
                if let Err(e) = &retried {
                    tracing::warn!(key, "MCP operation failed after recovery: {e}");
                    if e.is_recoverable() {
                        self.forget(key).await?;
                    }
                }
                retried
            }
            other => other,
        }
    }

    /// The session for `key`, waiting out a re-negotiation in progress.
    ///
    /// The key is absent from the store while its session is being replaced;
    /// a caller arriving then waits on the recovery lock instead of reporting
    /// the key as unknown.
    async fn registered(&self, key: &str) -> Result<Session, McpError> {
        if let Some(session) = self.store.get(key).await? {
            return Ok(session);
        }

        let pending = self.recovery_locks.lock().await.get(key).cloned();
        if let Some(lock) = pending {
            let _guard = lock.lock().await;
            if let Some(session) = self.store.get(key).await? {
                return Ok(session);
            }
        }

        Err(McpError::UnknownSession {
            key: key.to_string(),
        })
    }

    /// Replace a lost session, serialized per key.
    ///
    /// If another task already replaced `stale` while this one waited for the
    /// lock, the replacement is reused. A failed handshake leaves the key
    /// evicted and drops its lock.
    async fn renegotiate(&self, stale: &Session) -> Result<Session, McpError> {
        let lock = {
            let mut locks = self.recovery_locks.lock().await;
            Arc::clone(locks.entry(stale.key.clone()).or_default())
        };
        let _guard = lock.lock().await;

        let Some(current) = self.store.get(&stale.key).await? else {
            self.recovery_locks.lock().await.remove(&stale.key);
            return Err(McpError::UnknownSession {
                key: stale.key.clone(),
            });
        };
        if current != *stale {
            tracing::debug!(key = %stale.key, "Session already replaced by another task");
            return Ok(current);
        }

        self.store.evict(&stale.key).await?;
        match self
            .negotiator
            .negotiate(&stale.key, &stale.endpoint, &stale.token)
            .await
        {
            Ok(fresh) => {
                self.store.put(fresh.clone()).await?;
                Ok(fresh)
            }
            Err(e) => {
                self.forget(&stale.key).await?;
                Err(e)
            }
        }
    }
}

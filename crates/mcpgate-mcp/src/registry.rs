//! Session registry: where negotiated sessions live between calls.
//!
//! The store is a trait so a multi-instance deployment can back it with a
//! shared cache; the in-memory map suits a single process.

use crate::error::McpError;
use crate::session::Session;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::RwLock;

/// Boxed future returned by [`SessionStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, McpError>> + Send + 'a>>;

/// Keyed storage of negotiated sessions, at most one per key.
pub trait SessionStore: Send + Sync {
    /// Look up the session for `key`.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Session>>;

    /// Insert or replace the session under `session.key` (last write wins).
    fn put(&self, session: Session) -> StoreFuture<'_, ()>;

    /// Remove the session for `key`, returning it if present.
    fn evict<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Session>>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Session>> {
        Box::pin(async move { Ok(self.sessions.read().await.get(key).cloned()) })
    }

    fn put(&self, session: Session) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut sessions = self.sessions.write().await;
            if sessions.insert(session.key.clone(), session).is_some() {
                tracing::debug!("Replaced existing MCP session entry");
            }
            Ok(())
        })
    }

    fn evict<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Session>> {
        Box::pin(async move { Ok(self.sessions.write().await.remove(key)) })
    }
}

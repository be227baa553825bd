//! The negotiated MCP session.

use std::fmt;

/// A session negotiated with a remote MCP endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Caller-chosen key, e.g. the sandbox id.
    pub key: String,
    pub endpoint: String,
    pub token: String,
    /// Value of the `Mcp-Session-Id` handshake header, empty when the remote
    /// did not send one.
    pub session_id: String,
    pub established: bool,
}

impl Session {
    pub fn has_session_id(&self) -> bool {
        !self.session_id.is_empty()
    }
}

// Tokens are sandbox credentials; keep them out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("endpoint", &self.endpoint)
            .field("token", &redact(&self.token))
            .field("session_id", &self.session_id)
            .field("established", &self.established)
            .finish()
    }
}

/// Shorten a secret to its first four characters.
pub fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session {
            key: "sbx-1".into(),
            endpoint: "https://mcp.example/mcp".into(),
            token: "supersecrettoken".into(),
            session_id: "sess-42".into(),
            established: true,
        }
    }

    #[test]
    fn debug_redacts_token() {
        let out = format!("{:?}", sample());
        assert!(!out.contains("supersecrettoken"));
        assert!(out.contains("supe…"));
        assert!(out.contains("sess-42"));
    }

    #[test]
    fn redact_handles_short_and_empty() {
        assert_eq!(redact(""), "");
        assert_eq!(redact("ab"), "ab…");
    }

    #[test]
    fn empty_session_id_is_reported() {
        let mut s = sample();
        assert!(s.has_session_id());
        s.session_id.clear();
        assert!(!s.has_session_id());
    }
}

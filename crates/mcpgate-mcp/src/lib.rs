//! MCP (Model Context Protocol) session adapter for mcpgate.
//!
//! Talks to remote MCP servers over Streamable HTTP: each JSON-RPC message is
//! an HTTP POST, replies arrive as plain JSON or SSE framing, and a session id
//! issued during the `initialize` handshake accompanies every later request.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod jsonrpc;
pub mod manager;
pub mod negotiator;
pub mod registry;
pub mod session;
pub mod transport;

pub use client::{CallOutcome, ProtocolClient, ToolDescriptor};
pub use config::{DEFAULT_SETTLE_DELAY, McpConfig, PROTOCOL_VERSION};
pub use envelope::decode_envelope;
pub use error::McpError;
pub use jsonrpc::JsonRpcEnvelope;
pub use manager::SessionManager;
pub use negotiator::Negotiator;
pub use registry::{InMemorySessionStore, SessionStore};
pub use session::Session;
pub use transport::HttpTransport;

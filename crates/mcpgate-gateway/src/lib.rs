//! HTTP gateway for mcpgate.
//!
//! Exposes sandbox creation, tool listing and tool calls to a chat frontend
//! under `/api/mcp/*`, backed by the MCP session manager.

pub mod error;
pub mod provisioner;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{GatewayError, ProvisionError};
pub use provisioner::{
    HttpProvisioner, ProvisionedSandbox, SandboxHandle, SandboxProvisioner, StaticProvisioner,
};
pub use routes::{default_mcp_servers, router};
pub use server::{ServeError, serve, state_from_config};
pub use state::AppState;

//! mcpgate CLI: runs the MCP gateway HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use mcpgate_config::{CliOverrides, GatewayConfig, ProvisionerConfig, ProvisionerKind};
use std::io;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "mcpgate",
    version,
    about = "Gateway between chat frontends and sandboxed MCP servers"
)]
struct Cli {
    /// Address to listen on (overrides MCPGATE_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Sandbox provisioner: "http" or "static"
    #[arg(long)]
    provisioner: Option<String>,

    /// Base URL of the sandbox provisioning service
    #[arg(long)]
    provisioner_url: Option<String>,

    /// Fixed MCP endpoint for the static provisioner
    #[arg(long)]
    mcp_url: Option<String>,

    /// Pause after the MCP handshake, in milliseconds
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Log in JSON lines instead of human-readable text
    #[arg(long)]
    json_logs: bool,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let config = GatewayConfig::load(overrides(cli)?).context("Invalid configuration")?;

    match &config.provisioner {
        ProvisionerConfig::Http { base_url, .. } => {
            tracing::info!(provisioner = "http", %base_url, "Using sandbox provisioning service");
        }
        ProvisionerConfig::Static { mcp_url, .. } => {
            tracing::info!(provisioner = "static", %mcp_url, "Using fixed MCP endpoint");
        }
    }

    let state = mcpgate_gateway::state_from_config(&config)
        .context("Failed to set up gateway state")?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        signal.cancel();
    });

    mcpgate_gateway::serve(listener, state, shutdown)
        .await
        .context("Gateway server failed")
}

fn overrides(cli: Cli) -> Result<CliOverrides> {
    let provisioner_kind = cli
        .provisioner
        .as_deref()
        .map(str::parse::<ProvisionerKind>)
        .transpose()
        .context("Invalid --provisioner value")?;

    Ok(CliOverrides {
        bind: cli.bind,
        provisioner_kind,
        provisioner_url: cli.provisioner_url,
        mcp_url: cli.mcp_url,
        settle_delay_ms: cli.settle_delay_ms,
    })
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "mcpgate",
            "--bind",
            "0.0.0.0:8080",
            "--provisioner",
            "static",
            "--mcp-url",
            "http://localhost:8931/mcp",
            "--settle-delay-ms",
            "0",
            "--verbose",
        ]);
        assert_eq!(cli.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(cli.provisioner.as_deref(), Some("static"));
        assert_eq!(cli.mcp_url.as_deref(), Some("http://localhost:8931/mcp"));
        assert_eq!(cli.settle_delay_ms, Some(0));
        assert!(cli.verbose);
        assert!(!cli.json_logs);
    }

    #[test]
    fn overrides_carry_flags() {
        let cli = Cli::parse_from([
            "mcpgate",
            "--provisioner",
            "HTTP",
            "--provisioner-url",
            "https://p",
        ]);
        let overrides = overrides(cli).unwrap();
        assert_eq!(overrides.provisioner_kind, Some(ProvisionerKind::Http));
        assert_eq!(overrides.provisioner_url.as_deref(), Some("https://p"));
        assert!(overrides.bind.is_none());
    }

    #[test]
    fn unknown_provisioner_keeps_error_chain() {
        let cli = Cli::parse_from(["mcpgate", "--provisioner", "docker"]);
        let err = overrides(cli).unwrap_err();
        assert_eq!(err.to_string(), "Invalid --provisioner value");
        let chain = format!("{err:#}");
        assert!(chain.contains("expected 'http' or 'static', got 'docker'"), "{chain}");
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

//! MCP Server Entry Point
//!
//! This is the main entry point for the MCP server. It initializes logging,
//! loads configuration, and starts the server with the configured transport.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

use sd_webui_mcp_server::core::{Config, McpServer, TransportService};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = Config::from_env();

    // Initialize logging
    init_logging(&config.logging.level);
    install_panic_hook();

    if let Err(e) = run(config).await {
        error!("Fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    info!("Starting {} v{}", config.server.name, config.server.version);

    // Create the MCP server
    let server = McpServer::new(config.clone()).context("Failed to initialize server")?;

    info!("Server initialized");

    // Create and run the transport service
    let transport = TransportService::new(config.transport);

    tokio::select! {
        result = transport.run(server) => result.context("Transport failed")?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Configures tracing with the specified log level and format. Output goes
/// to stderr so stdout stays free for the STDIO transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Log uncaught panics before the process dies.
///
/// The hook exits with status 1 after a short pause so the stderr writer
/// has a chance to flush the final record.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        error!("Panic: {info}");
        std::thread::sleep(Duration::from_millis(100));
        std::process::exit(1);
    }));
}

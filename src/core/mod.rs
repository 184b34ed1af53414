//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server,
//! including configuration, output directory handling, server lifecycle
//! management, and transport layer abstractions.

pub mod config;
pub mod output;
pub mod server;
pub mod transport;

pub use config::Config;
pub use output::OutputError;
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};

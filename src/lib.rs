//! Stable Diffusion WebUI MCP Server
//!
//! This crate provides a Model Context Protocol (MCP) server that exposes a
//! Stable Diffusion WebUI (AUTOMATIC1111/Forge) instance as a set of tools,
//! with a modular architecture organized by domains.
//!
//! # Architecture
//!
//! The server is organized into the following modules:
//!
//! - **core**: Core infrastructure including configuration, output directory
//!   handling, the main server and transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **tools**: MCP tools that can be executed by clients
//! - **sd**: HTTP client, payloads and responses for the WebUI REST API
//!
//! # Example
//!
//! ```rust,no_run
//! use sd_webui_mcp_server::{core::Config, core::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config)?;
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;
pub mod sd;

// Re-export commonly used types for convenience
pub use core::{Config, McpServer};
